use log::warn;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:photo_vote.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub session_check_interval: Duration,
    /// Emails that hold the admin capability whatever role the identity layer reports.
    pub admin_emails: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
            session_check_interval: Duration::from_secs(60),
            admin_emails: Vec::new(),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment. Load `.env` first if wanted.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_nonzero_var("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            busy_timeout: Duration::from_millis(parse_var(
                "DATABASE_BUSY_TIMEOUT_MS",
                defaults.busy_timeout.as_millis() as u64,
            )),
            session_check_interval: Duration::from_secs(parse_nonzero_var(
                "SESSION_CHECK_INTERVAL_SECS",
                defaults.session_check_interval.as_secs(),
            )),
            admin_emails: env::var("ADMIN_EMAILS")
                .map(|raw| parse_email_list(&raw))
                .unwrap_or_default(),
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    parse_value(key, env::var(key).ok().as_deref(), default)
}

/// Like `parse_var`, but zero also falls back to the default. Used for pool
/// sizes and timer periods, where zero is unusable.
fn parse_nonzero_var<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy + Default + PartialEq,
    T::Err: Display,
{
    parse_nonzero(key, env::var(key).ok().as_deref(), default)
}

fn parse_value<T>(key: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {} value '{}': {}, using default {}", key, raw, e, default);
            default
        }),
        None => default,
    }
}

fn parse_nonzero<T>(key: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Display + Copy + Default + PartialEq,
    T::Err: Display,
{
    let value = parse_value(key, raw, default);
    if value == T::default() {
        warn!("{} must be greater than zero, using default {}", key, default);
        default
    } else {
        value
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|email| email.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_list() {
        assert_eq!(
            parse_email_list(" Root@Example.com, ,judge@example.com"),
            vec!["root@example.com".to_string(), "judge@example.com".to_string()]
        );
        assert!(parse_email_list("").is_empty());
    }

    #[test]
    fn test_parse_value_falls_back_on_garbage() {
        assert_eq!(parse_value("DATABASE_BUSY_TIMEOUT_MS", Some(" 250 "), 5000u64), 250);
        assert_eq!(parse_value("DATABASE_BUSY_TIMEOUT_MS", Some("soon"), 5000u64), 5000);
        assert_eq!(parse_value("DATABASE_BUSY_TIMEOUT_MS", None, 5000u64), 5000);
    }

    #[test]
    fn test_zero_pool_size_and_interval_use_defaults() {
        assert_eq!(parse_nonzero("DATABASE_MAX_CONNECTIONS", Some("0"), 5u32), 5);
        assert_eq!(parse_nonzero("DATABASE_MAX_CONNECTIONS", Some("12"), 5u32), 12);
        assert_eq!(parse_nonzero("SESSION_CHECK_INTERVAL_SECS", Some("0"), 60u64), 60);
        assert_eq!(parse_nonzero("SESSION_CHECK_INTERVAL_SECS", Some("30"), 60u64), 30);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default().with_database_url("sqlite::memory:");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 5);
        assert!(config.admin_emails.is_empty());
    }
}
