use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of photos that make up a winner declaration.
pub const WINNER_COUNT: usize = 3;

/// This contest type allows a single ballot per user per cycle.
pub const MAX_VOTES_PER_USER: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::User => write!(f, "USER"),
        }
    }
}

/// An already-authenticated caller, as handed over by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub email: String,
    pub name: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Admin identity used by background tasks such as the expiry watcher.
    pub fn system() -> Self {
        Self::new("system", Role::Admin, "system@localhost").with_name("System")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSettings {
    pub is_active: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub winners: Vec<String>,
    pub results_published: bool,
    pub max_votes_per_user: i64,
}

impl Default for VotingSettings {
    fn default() -> Self {
        Self {
            is_active: false,
            start_time: None,
            end_time: None,
            winners: Vec::new(),
            results_published: false,
            max_votes_per_user: MAX_VOTES_PER_USER,
        }
    }
}

/// Where the contest is in its lifecycle, as seen by a poller at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VotingPhase {
    NotStarted,
    Scheduled,
    Active,
    /// Still flagged active, but `end_time` has passed and nobody stopped it yet.
    Expired,
    Stopped,
    WinnersDeclared,
    Published,
}

impl VotingSettings {
    pub fn phase(&self, now: DateTime<Utc>) -> VotingPhase {
        if self.is_active {
            if self.start_time.is_some_and(|start| start > now) {
                VotingPhase::Scheduled
            } else if self.is_expired_at(now) {
                VotingPhase::Expired
            } else {
                VotingPhase::Active
            }
        } else if self.results_published {
            VotingPhase::Published
        } else if !self.winners.is_empty() {
            VotingPhase::WinnersDeclared
        } else if self.start_time.is_some() {
            VotingPhase::Stopped
        } else {
            VotingPhase::NotStarted
        }
    }

    /// Ballots are accepted while active and once the scheduled start is reached.
    /// `end_time` is advisory and not checked here.
    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_time.is_none_or(|start| start <= now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_time.is_some_and(|end| end < now)
    }

    /// Checks the cross-field invariants of a settings record.
    pub fn validate(&self) -> Result<(), String> {
        if !self.winners.is_empty() {
            validate_winner_ids(&self.winners)?;
        }
        if self.results_published && self.winners.len() != WINNER_COUNT {
            return Err(format!(
                "results cannot be published without exactly {} winners",
                WINNER_COUNT
            ));
        }
        if self.is_active && !self.winners.is_empty() {
            return Err("voting cannot be active while winners are declared".to_string());
        }
        Ok(())
    }
}

/// Returns an error message unless `ids` holds exactly three distinct photo ids.
pub fn validate_winner_ids(ids: &[String]) -> Result<(), String> {
    if ids.len() != WINNER_COUNT {
        return Err(format!(
            "must declare exactly {} winners, got {}",
            WINNER_COUNT,
            ids.len()
        ));
    }
    let distinct: HashSet<&str> = ids.iter().map(String::as_str).collect();
    if distinct.len() != ids.len() {
        return Err("winner ids must be distinct".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    pub start_time: Option<DateTime<Utc>>,
    pub duration_hours: Option<i64>,
}

impl StartOptions {
    /// Resolves the session window, defaulting the start to `now`. Fails when
    /// the duration is not positive or the end time is out of range.
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>), String> {
        let start = self.start_time.unwrap_or(now);
        let end = match self.duration_hours {
            None => None,
            Some(hours) if hours <= 0 => {
                return Err("duration must be a positive number of hours".to_string());
            }
            Some(hours) => {
                let end = Duration::try_hours(hours).and_then(|length| start.checked_add_signed(length));
                Some(end.ok_or_else(|| format!("a duration of {} hours is out of range", hours))?)
            }
        };
        Ok((start, end))
    }
}

/// Partial update applied by `update_settings`. Winners are only ever set by
/// declaring them, so they are not part of this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub is_active: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub results_published: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }

    pub fn apply_to(&self, settings: &mut VotingSettings) {
        if let Some(is_active) = self.is_active {
            settings.is_active = is_active;
        }
        if let Some(start_time) = self.start_time {
            settings.start_time = Some(start_time);
        }
        if let Some(end_time) = self.end_time {
            settings.end_time = Some(end_time);
        }
        if let Some(results_published) = self.results_published {
            settings.results_published = results_published;
        }
    }
}

/// A user's single vote for the current contest cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub user_id: String,
    pub photo_id: String,
    pub voter_email: String,
    pub voter_name: Option<String>,
    pub voted_at: DateTime<Utc>,
}

impl Ballot {
    pub fn new(voter: &Actor, photo_id: &str, voted_at: DateTime<Utc>) -> Self {
        Self {
            user_id: voter.user_id.clone(),
            photo_id: photo_id.to_string(),
            voter_email: voter.email.clone(),
            voter_name: voter.name.clone(),
            voted_at,
        }
    }
}

/// A contest photo together with its tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub name: String,
    pub participant_name: Option<String>,
    pub participant_email: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub vote_count: i64,
    pub is_winner: bool,
    pub winner_position: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub name: String,
    pub participant_name: Option<String>,
    pub participant_email: Option<String>,
}

impl Photo {
    pub fn new(new_photo: NewPhoto) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: new_photo.name,
            participant_name: new_photo.participant_name,
            participant_email: new_photo.participant_email,
            uploaded_at: Utc::now(),
            vote_count: 0,
            is_winner: false,
            winner_position: None,
        }
    }
}
