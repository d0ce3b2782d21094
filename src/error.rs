use serde::Serialize;
use thiserror::Error;

pub type VoteResult<T> = Result<T, VoteError>;

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Authentication required")]
    Unauthenticated,

    /// Carries the action that was refused, e.g. "start voting".
    #[error("Only admins can {0}")]
    Forbidden(&'static str),

    #[error("Voting is not currently active")]
    VotingNotActive,

    #[error("Photo {0} not found")]
    PhotoNotFound(String),

    #[error("You have already voted")]
    AlreadyVoted,

    #[error("Invalid winner declaration: {0}")]
    InvalidWinnerCount(String),

    #[error("Voting must be stopped before winners are declared")]
    VotingStillActive,

    #[error("Invalid voting settings: {0}")]
    InvalidSettings(String),

    #[error("Results have not been published yet")]
    ResultsNotPublished,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Serializable error shape handed back to callers of the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl VoteError {
    pub fn code(&self) -> &'static str {
        match self {
            VoteError::Unauthenticated => "UNAUTHENTICATED",
            VoteError::Forbidden(_) => "FORBIDDEN",
            VoteError::VotingNotActive => "VOTING_NOT_ACTIVE",
            VoteError::PhotoNotFound(_) => "PHOTO_NOT_FOUND",
            VoteError::AlreadyVoted => "ALREADY_VOTED",
            VoteError::InvalidWinnerCount(_) => "INVALID_WINNER_COUNT",
            VoteError::VotingStillActive => "VOTING_STILL_ACTIVE",
            VoteError::InvalidSettings(_) => "INVALID_SETTINGS",
            VoteError::ResultsNotPublished => "RESULTS_NOT_PUBLISHED",
            VoteError::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Storage failures may succeed on a fresh attempt; domain outcomes never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, VoteError::Database(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            VoteError::Database(e) => {
                log::error!("Internal error: {}", e);
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody {
            code: self.code(),
            message,
        }
    }
}
