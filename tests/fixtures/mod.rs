//! Test fixtures shared by the integration tests

#![allow(dead_code)]

use matchmaker::{MatchListener, MatchmakingOptions, MatchmakingResult, PlayerData};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Listener that records every match it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    results: Arc<Mutex<Vec<MatchmakingResult>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded results, in delivery order
    pub fn results(&self) -> Vec<MatchmakingResult> {
        self.results
            .lock()
            .map(|results| results.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Poll until at least `count` results arrived or `timeout` elapsed
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.count() >= count
    }
}

impl MatchListener for RecordingListener {
    fn on_match_found(&self, result: MatchmakingResult) {
        if let Ok(mut results) = self.results.lock() {
            results.push(result);
        }
    }
}

pub fn player(id: &str, level: i64) -> PlayerData {
    PlayerData::new(id, level, "US")
}

/// Options for tests driving matches through `join` only
pub fn join_only_options(max_players: usize, max_level_diff: u32) -> MatchmakingOptions {
    MatchmakingOptions::new(
        max_players,
        Duration::from_secs(60),
        Duration::from_secs(600),
        max_level_diff,
    )
}

/// Options with millisecond timings for scheduler tests
pub fn fast_options(
    max_players: usize,
    max_level_diff: u32,
    interval_ms: u64,
    timeout_ms: u64,
) -> MatchmakingOptions {
    MatchmakingOptions::new(
        max_players,
        Duration::from_millis(interval_ms),
        Duration::from_millis(timeout_ms),
        max_level_diff,
    )
}

/// Every pair of players in the match is within `max_level_diff`
pub fn levels_within(result: &MatchmakingResult, max_level_diff: u32) -> bool {
    result.players.iter().all(|a| {
        result
            .players
            .iter()
            .all(|b| a.level.abs_diff(b.level) <= u64::from(max_level_diff))
    })
}
