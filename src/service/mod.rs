//! Service layer for the matchmaker
//!
//! This module contains the matchmaking service façade composing the player
//! pool, the match finder and the expiry scheduler.

pub mod matchmaking;

pub use matchmaking::{MatchmakingService, QueueStats};
