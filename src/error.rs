//! Error types for the matchmaking service
//!
//! Core operations return [`MatchmakingError`] directly so callers can match on
//! the variant. Application plumbing (configuration, binaries) uses anyhow.

/// Result type alias for application-level plumbing
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("player already in matchmaking: {player_id}")]
    AlreadyInMatchmaking { player_id: String },

    #[error("Invalid matchmaking configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Expiry scheduler is already running")]
    SchedulerAlreadyRunning,

    #[error("Competition not found: {competition_id}")]
    CompetitionNotFound { competition_id: String },

    #[error("Player {player_id} is not part of competition {competition_id}")]
    PlayerNotInCompetition {
        competition_id: String,
        player_id: String,
    },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    pub(crate) fn lock_poisoned(what: &str) -> Self {
        Self::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}
