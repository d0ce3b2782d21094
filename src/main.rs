use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::error;
use photo_vote::handlers::{self, Request, Response};
use photo_vote::models::{Actor, NewPhoto, Role, SettingsUpdate, StartOptions};
use photo_vote::tasks::session_closer;
use photo_vote::{Config, Database, VoteError, VotingEngine};
use serde::Serialize;
use std::process;
use std::sync::Arc;

/// Operator tool for the photo contest vote.
///
/// The caller identity is taken from the flags as-is; authenticating it is the
/// job of whatever sits in front of this tool.
#[derive(Parser)]
#[command(name = "photo-vote", version)]
struct Cli {
    /// Overrides DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,

    /// Id of the calling user. Without it every request is unauthenticated.
    #[arg(long)]
    user_id: Option<String>,

    #[arg(long, default_value = "user")]
    role: Role,

    #[arg(long, default_value = "")]
    email: String,

    #[arg(long)]
    name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the voting settings
    Settings,
    /// Change individual voting settings (admin)
    UpdateSettings {
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        start_time: Option<DateTime<Utc>>,
        #[arg(long)]
        end_time: Option<DateTime<Utc>>,
        #[arg(long)]
        results_published: Option<bool>,
    },
    /// Open a voting session (admin)
    Start {
        /// RFC 3339 start; defaults to now
        #[arg(long)]
        start_time: Option<DateTime<Utc>>,
        #[arg(long)]
        duration_hours: Option<i64>,
    },
    /// Close the voting session (admin)
    Stop,
    /// Cast the caller's vote
    Vote { photo_id: String },
    /// Show the caller's vote
    MyVote,
    /// Full voting breakdown (admin)
    Analytics,
    /// Declare first, second and third place (admin)
    Declare { winner_ids: Vec<String> },
    /// Show the declared winners
    Winners,
    /// Show all photos ranked by votes
    Standings {
        /// Print a text table instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Clear all votes, winners and settings (admin)
    Reset,
    /// Add a photo to the contest
    AddPhoto {
        name: String,
        #[arg(long)]
        participant_name: Option<String>,
        #[arg(long)]
        participant_email: Option<String>,
    },
    /// List contest photos
    Photos,
    /// Keep running and stop voting once its end time has passed
    Watch,
}

impl Cli {
    fn actor(&self) -> Option<Actor> {
        let user_id = self.user_id.as_ref()?;
        let mut actor = Actor::new(user_id.clone(), self.role, self.email.clone());
        actor.name = self.name.clone();
        Some(actor)
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = &cli.database_url {
        config = config.with_database_url(url.clone());
    }

    let database = match Database::new(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            process::exit(1);
        }
    };
    let engine = Arc::new(VotingEngine::new(database).with_admin_emails(config.admin_emails.clone()));
    let actor = cli.actor();

    let request = match cli.command {
        Command::Watch => {
            session_closer::check_expired_session_task(engine, config.session_check_interval).await;
            return;
        }
        Command::AddPhoto {
            name,
            participant_name,
            participant_email,
        } => {
            let created = engine
                .database()
                .create_photo(NewPhoto {
                    name,
                    participant_name,
                    participant_email,
                })
                .await
                .map_err(VoteError::from);
            finish(created);
            return;
        }
        Command::Photos => {
            finish(engine.database().list_photos().await.map_err(VoteError::from));
            return;
        }
        Command::Standings { text: true } => {
            match handlers::handle_request(&engine, actor.as_ref(), Request::GetStandings).await {
                Ok(Response::Standings { standings }) => println!("{}", standings.summary()),
                Ok(other) => finish(Ok(other)),
                Err(e) => finish::<()>(Err(e)),
            }
            return;
        }
        Command::Standings { text: false } => Request::GetStandings,
        Command::Settings => Request::GetSettings,
        Command::UpdateSettings {
            active,
            start_time,
            end_time,
            results_published,
        } => Request::UpdateSettings(SettingsUpdate {
            is_active: active,
            start_time,
            end_time,
            results_published,
        }),
        Command::Start {
            start_time,
            duration_hours,
        } => Request::StartVoting(StartOptions {
            start_time,
            duration_hours,
        }),
        Command::Stop => Request::StopVoting,
        Command::Vote { photo_id } => Request::CastVote { photo_id },
        Command::MyVote => Request::GetMyVote,
        Command::Analytics => Request::GetAnalytics,
        Command::Declare { winner_ids } => Request::DeclareWinners { winner_ids },
        Command::Winners => Request::GetWinners,
        Command::Reset => Request::ResetVoting,
    };

    finish(handlers::handle_request(&engine, actor.as_ref(), request).await);
}

/// Prints the outcome as JSON and exits non-zero on failure.
fn finish<T: Serialize>(result: Result<T, VoteError>) {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            let body = e.to_body();
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}: {}", body.code, body.message),
            }
            process::exit(1);
        }
    }
}
