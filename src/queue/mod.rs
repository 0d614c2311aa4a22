//! Matchmaking queue: the player pool and the match finding algorithms

pub mod matching;
pub mod pool;

pub use matching::{LevelMatchFinder, MatchFinder};
pub use pool::{PlayerPool, QueueEntry};
