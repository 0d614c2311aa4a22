//! Matchmaker - level-based matchmaking queue for competitions
//!
//! This crate groups players who join a queue into competitions. A join
//! completes a match immediately when enough players of similar level are
//! waiting; a background scheduler forces matches for players who waited past
//! the configured timeout so nobody waits indefinitely.

pub mod competition;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use config::MatchmakingOptions;
pub use scheduler::{MatchListener, SchedulerHandle};
pub use service::MatchmakingService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
