//! Competitions created from completed matches
//!
//! This is the downstream collaborator of the matchmaking core: it records a
//! leaderboard per match and accepts score increments.

pub mod bridge;
pub mod storage;

pub use bridge::CompetitionBridge;
pub use storage::{CompetitionStorage, InMemoryCompetitionStorage};
