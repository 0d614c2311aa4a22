//! Player pool holding every queued, unmatched player
//!
//! The pool keeps two views of the same entries: an index by player id and an
//! ordering by join time (oldest first). Both are updated together by every
//! mutation, so a player is present in one exactly when it is present in the
//! other.

use crate::error::MatchmakingError;
use crate::types::{PlayerData, PlayerId};
use crate::utils::add_duration;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// A queued player together with its join and expiry times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub player: PlayerData,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Insertion number assigned by the pool, strictly increasing
    pub sequence: u64,
}

impl QueueEntry {
    pub fn new(player: PlayerData, created_at: DateTime<Utc>, entry_timeout: Duration) -> Self {
        Self {
            player,
            created_at,
            expires_at: add_duration(created_at, entry_timeout),
            sequence: 0,
        }
    }

    /// An entry is expired once `now` reaches its expiry time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Index plus FIFO ordering of queued players.
///
/// Not synchronized on its own; the service guards it with a single mutex.
#[derive(Debug, Default)]
pub struct PlayerPool {
    index: HashMap<PlayerId, PlayerData>,
    queue: VecDeque<QueueEntry>,
    last_sequence: u64,
}

impl PlayerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the tail of the ordering.
    ///
    /// If the wall clock stepped backwards since the previous join, the entry
    /// is re-stamped with the tail's join time (keeping its timeout length) so
    /// the ordering stays sorted by `created_at`.
    pub fn insert(&mut self, mut entry: QueueEntry) -> Result<(), MatchmakingError> {
        if self.index.contains_key(&entry.player.id) {
            return Err(MatchmakingError::AlreadyInMatchmaking {
                player_id: entry.player.id.clone(),
            });
        }

        if let Some(tail) = self.queue.back() {
            if entry.created_at < tail.created_at {
                let shift = tail.created_at - entry.created_at;
                entry.created_at = tail.created_at;
                entry.expires_at = entry
                    .expires_at
                    .checked_add_signed(shift)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
            }
        }

        self.last_sequence += 1;
        entry.sequence = self.last_sequence;
        self.index
            .insert(entry.player.id.clone(), entry.player.clone());
        self.queue.push_back(entry);
        Ok(())
    }

    /// Remove every given player from both views; unknown players are ignored.
    ///
    /// Returns the removed entries, oldest first.
    pub fn remove_all(&mut self, players: &[PlayerData]) -> Vec<QueueEntry> {
        let ids: HashSet<&str> = players
            .iter()
            .map(|p| p.id.as_str())
            .filter(|id| self.index.contains_key(*id))
            .collect();
        if ids.is_empty() {
            return Vec::new();
        }

        for id in &ids {
            self.index.remove(*id);
        }

        let mut removed = Vec::with_capacity(ids.len());
        let mut kept = VecDeque::with_capacity(self.queue.len() - ids.len());
        for entry in self.queue.drain(..) {
            if ids.contains(entry.player.id.as_str()) {
                removed.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.queue = kept;
        removed
    }

    /// Sequence number of the most recently inserted entry
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Entry with the earliest join time
    pub fn oldest(&self) -> Option<&QueueEntry> {
        self.queue.front()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.index.contains_key(player_id)
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerData> {
        self.index.get(player_id)
    }

    /// Read-only iteration over the entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> + '_ {
        self.queue.iter()
    }

    /// Owned copy of the entries, oldest first, for reading after the lock
    /// is released
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.queue.iter().cloned().collect()
    }

    /// Check that index and ordering hold the same players exactly once and
    /// that the ordering is sorted by join time.
    pub fn is_consistent(&self) -> bool {
        if self.index.len() != self.queue.len() {
            return false;
        }

        let mut seen = HashSet::with_capacity(self.queue.len());
        for entry in &self.queue {
            if !seen.insert(entry.player.id.as_str()) {
                return false;
            }
            if self.index.get(&entry.player.id) != Some(&entry.player) {
                return false;
            }
        }

        self.queue
            .iter()
            .zip(self.queue.iter().skip(1))
            .all(|(a, b)| a.created_at <= b.created_at)
    }
}
