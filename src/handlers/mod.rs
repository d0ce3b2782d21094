//! Boundary between callers and the engine: requires an identity, routes each
//! request to the engine and applies the results visibility rule.

use crate::engine::{ResetSummary, ResultsSnapshot, VotingEngine};
use crate::error::{VoteError, VoteResult};
use crate::models::{Actor, Ballot, Photo, SettingsUpdate, StartOptions, VotingPhase, VotingSettings};
use crate::voting::{Standings, VotingAnalytics};
use chrono::Utc;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetSettings,
    UpdateSettings(SettingsUpdate),
    StartVoting(StartOptions),
    StopVoting,
    CastVote { photo_id: String },
    GetMyVote,
    GetAnalytics,
    DeclareWinners { winner_ids: Vec<String> },
    GetWinners,
    GetStandings,
    ResetVoting,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetSettings => "GetSettings",
            Request::UpdateSettings(_) => "UpdateSettings",
            Request::StartVoting(_) => "StartVoting",
            Request::StopVoting => "StopVoting",
            Request::CastVote { .. } => "CastVote",
            Request::GetMyVote => "GetMyVote",
            Request::GetAnalytics => "GetAnalytics",
            Request::DeclareWinners { .. } => "DeclareWinners",
            Request::GetWinners => "GetWinners",
            Request::GetStandings => "GetStandings",
            Request::ResetVoting => "ResetVoting",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Settings {
        settings: VotingSettings,
        phase: VotingPhase,
    },
    VoteRecorded {
        message: &'static str,
        vote: Ballot,
    },
    MyVote {
        vote: Option<Ballot>,
    },
    Analytics {
        analytics: VotingAnalytics,
    },
    Winners {
        winners: Vec<Photo>,
    },
    Standings {
        standings: Standings,
    },
    Reset {
        message: &'static str,
        reset: ResetSummary,
    },
}

impl Response {
    fn settings(settings: VotingSettings) -> Self {
        let phase = settings.phase(Utc::now());
        Response::Settings { settings, phase }
    }
}

/// Runs one request on behalf of `actor`. A missing actor is `Unauthenticated`.
pub async fn handle_request(
    engine: &VotingEngine,
    actor: Option<&Actor>,
    request: Request,
) -> VoteResult<Response> {
    let actor = actor.ok_or(VoteError::Unauthenticated)?;
    info!("Received {} from {}", request.name(), actor.user_id);

    let response = match request {
        Request::GetSettings => Response::settings(engine.get_settings().await?),
        Request::UpdateSettings(update) => Response::settings(engine.update_settings(actor, update).await?),
        Request::StartVoting(options) => Response::settings(engine.start(actor, options).await?),
        Request::StopVoting => Response::settings(engine.stop(actor).await?),
        Request::CastVote { photo_id } => Response::VoteRecorded {
            message: "Vote recorded successfully",
            vote: engine.vote(actor, &photo_id).await?,
        },
        Request::GetMyVote => Response::MyVote {
            vote: engine.get_user_vote(&actor.user_id).await?,
        },
        Request::GetAnalytics => Response::Analytics {
            analytics: engine.get_analytics(actor).await?,
        },
        Request::DeclareWinners { winner_ids } => Response::Winners {
            winners: engine.declare_winners(actor, &winner_ids).await?,
        },
        Request::GetWinners => Response::Winners {
            winners: published_results(engine, actor).await?.winners(),
        },
        Request::GetStandings => Response::Standings {
            standings: published_results(engine, actor).await?.standings(),
        },
        Request::ResetVoting => Response::Reset {
            message: "Voting system reset successfully",
            reset: engine.reset_voting(actor).await?,
        },
    };

    Ok(response)
}

/// Non-admins only see results once they are published; admins always do.
/// The check and the results come from the same snapshot.
async fn published_results(engine: &VotingEngine, actor: &Actor) -> VoteResult<ResultsSnapshot> {
    let snapshot = engine.get_results_snapshot().await?;
    if snapshot.settings.results_published || engine.is_admin(actor) {
        Ok(snapshot)
    } else {
        Err(VoteError::ResultsNotPublished)
    }
}
