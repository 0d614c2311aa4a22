//! Competition storage interface and in-memory implementation
//!
//! A competition is created for every match handed out by the matchmaking
//! service; scores are incremented per player afterwards.

use crate::error::MatchmakingError;
use crate::types::{Competition, CompetitionId, CompetitionRecord, PlayerId};
use crate::utils::{current_timestamp, generate_competition_id};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

/// Trait for competition storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompetitionStorage: Send + Sync {
    /// Create a competition for the given players, each starting at score 0
    async fn create(
        &self,
        players: Vec<PlayerId>,
        ends_at: DateTime<Utc>,
    ) -> Result<Competition, MatchmakingError>;

    /// Add `score` to a player's leaderboard row
    async fn increment_score(
        &self,
        competition_id: CompetitionId,
        player_id: PlayerId,
        score: i64,
    ) -> Result<(), MatchmakingError>;

    /// Get a competition with its leaderboard sorted by score, highest first
    async fn get_competition_by_id(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Competition, MatchmakingError>;

    /// Get the most recent competition the player was matched into
    async fn get_last_competition_by_player_id(
        &self,
        player_id: PlayerId,
    ) -> Result<Competition, MatchmakingError>;
}

#[derive(Debug, Default)]
struct StorageState {
    competitions: HashMap<CompetitionId, Competition>,
    last_by_player: HashMap<PlayerId, CompetitionId>,
}

/// In-memory competition storage
#[derive(Debug)]
pub struct InMemoryCompetitionStorage {
    state: RwLock<StorageState>,
    max_competitions: usize,
}

impl InMemoryCompetitionStorage {
    /// Create a new in-memory storage keeping at most `max_competitions`
    pub fn new(max_competitions: usize) -> Self {
        Self {
            state: RwLock::new(StorageState::default()),
            max_competitions: max_competitions.max(1),
        }
    }

    /// Number of stored competitions
    pub fn len(&self) -> Result<usize, MatchmakingError> {
        Ok(self.read_state()?.competitions.len())
    }

    pub fn is_empty(&self) -> Result<bool, MatchmakingError> {
        Ok(self.len()? == 0)
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, StorageState>, MatchmakingError> {
        self.state
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("competitions read"))
    }

    fn write_state(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, StorageState>, MatchmakingError> {
        self.state
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("competitions write"))
    }

    /// Evict the oldest competitions once over capacity
    fn evict_if_needed(&self, state: &mut StorageState) {
        if state.competitions.len() <= self.max_competitions {
            return;
        }

        let mut entries: Vec<_> = state
            .competitions
            .values()
            .map(|c| (c.id, c.created_at))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        let to_remove = state.competitions.len() - self.max_competitions;
        for (id, _) in entries.into_iter().take(to_remove) {
            state.competitions.remove(&id);
        }
        state
            .last_by_player
            .retain(|_, competition_id| state.competitions.contains_key(competition_id));

        debug!("Evicted {} old competitions", to_remove);
    }
}

impl Default for InMemoryCompetitionStorage {
    fn default() -> Self {
        Self::new(100_000)
    }
}

fn sorted_leaderboard(competition: &Competition) -> Competition {
    let mut competition = competition.clone();
    // Stable sort keeps match order among equal scores
    competition
        .records
        .sort_by(|a, b| b.score.cmp(&a.score));
    competition
}

#[async_trait]
impl CompetitionStorage for InMemoryCompetitionStorage {
    async fn create(
        &self,
        players: Vec<PlayerId>,
        ends_at: DateTime<Utc>,
    ) -> Result<Competition, MatchmakingError> {
        let mut seen = HashSet::with_capacity(players.len());
        let records = players
            .into_iter()
            .filter(|player_id| seen.insert(player_id.clone()))
            .map(|player_id| CompetitionRecord {
                player_id,
                score: 0,
            })
            .collect();

        let competition = Competition {
            id: generate_competition_id(),
            created_at: current_timestamp(),
            ends_at,
            records,
        };

        let mut state = self.write_state()?;
        for record in &competition.records {
            state
                .last_by_player
                .insert(record.player_id.clone(), competition.id);
        }
        state
            .competitions
            .insert(competition.id, competition.clone());
        self.evict_if_needed(&mut state);

        debug!(
            "Created competition {} with {} players",
            competition.id,
            competition.records.len()
        );
        Ok(competition)
    }

    async fn increment_score(
        &self,
        competition_id: CompetitionId,
        player_id: PlayerId,
        score: i64,
    ) -> Result<(), MatchmakingError> {
        let mut state = self.write_state()?;
        let competition = state.competitions.get_mut(&competition_id).ok_or_else(|| {
            MatchmakingError::CompetitionNotFound {
                competition_id: competition_id.to_string(),
            }
        })?;

        let record = competition
            .records
            .iter_mut()
            .find(|r| r.player_id == player_id)
            .ok_or_else(|| MatchmakingError::PlayerNotInCompetition {
                competition_id: competition_id.to_string(),
                player_id: player_id.clone(),
            })?;

        record.score = record.score.saturating_add(score);
        Ok(())
    }

    async fn get_competition_by_id(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Competition, MatchmakingError> {
        let state = self.read_state()?;
        state
            .competitions
            .get(&competition_id)
            .map(sorted_leaderboard)
            .ok_or_else(|| MatchmakingError::CompetitionNotFound {
                competition_id: competition_id.to_string(),
            })
    }

    async fn get_last_competition_by_player_id(
        &self,
        player_id: PlayerId,
    ) -> Result<Competition, MatchmakingError> {
        let state = self.read_state()?;
        state
            .last_by_player
            .get(&player_id)
            .and_then(|id| state.competitions.get(id))
            .map(sorted_leaderboard)
            .ok_or_else(|| MatchmakingError::CompetitionNotFound {
                competition_id: format!("latest for player {}", player_id),
            })
    }
}
