//! Common types used throughout the matchmaking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for competitions
pub type CompetitionId = Uuid;

/// Matching attributes of a player asking to join the queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerData {
    pub id: PlayerId,
    pub level: i64,
    pub country_code: String,
}

impl PlayerData {
    pub fn new(id: impl Into<PlayerId>, level: i64, country_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            country_code: country_code.into(),
        }
    }
}

/// Outcome of a matchmaking attempt.
///
/// Returned directly from `join` and handed to the registered listener for
/// forced matches. `players` is empty whenever `match_found` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingResult {
    pub match_found: bool,
    pub players: Vec<PlayerData>,
}

impl MatchmakingResult {
    pub fn not_found() -> Self {
        Self {
            match_found: false,
            players: Vec::new(),
        }
    }

    pub fn found(players: Vec<PlayerData>) -> Self {
        Self {
            match_found: true,
            players,
        }
    }

    /// Identities of the matched players, in match order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }
}

/// Which path produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchSource {
    /// Completed synchronously while a player joined
    Immediate,
    /// Forced by the expiry scheduler after a player timed out
    Forced,
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchSource::Immediate => write!(f, "immediate"),
            MatchSource::Forced => write!(f, "forced"),
        }
    }
}

/// A single leaderboard row of a competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionRecord {
    pub player_id: PlayerId,
    pub score: i64,
}

/// A competition created from one completed match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub created_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(rename = "leaderboard")]
    pub records: Vec<CompetitionRecord>,
}

impl Competition {
    pub fn has_player(&self, player_id: &str) -> bool {
        self.records.iter().any(|r| r.player_id == player_id)
    }

    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }
}
