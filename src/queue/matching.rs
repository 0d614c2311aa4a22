//! Match finding algorithms
//!
//! A match finder picks a group of compatible players around one anchor
//! player. It only reads the pool; removing the matched players is up to the
//! caller.

use crate::config::MatchmakingOptions;
use crate::queue::pool::PlayerPool;
use crate::types::PlayerData;
use crate::utils::levels_within_tolerance;

/// Trait for match finding algorithms
pub trait MatchFinder: Send + Sync {
    /// Select up to `max_players_in_match` players compatible with `anchor`.
    ///
    /// The result always starts with the anchor, never contains it twice and
    /// is deterministic for a given pool.
    fn find_match(
        &self,
        anchor: &PlayerData,
        pool: &PlayerPool,
        options: &MatchmakingOptions,
    ) -> Vec<PlayerData>;

    /// Check if a candidate may be grouped with the anchor
    fn is_compatible(
        &self,
        anchor: &PlayerData,
        candidate: &PlayerData,
        options: &MatchmakingOptions,
    ) -> bool;
}

/// Level-based match finder.
///
/// Candidates are scanned in join order, so the longest waiting compatible
/// players are picked first.
#[derive(Debug, Default, Clone, Copy)]
pub struct LevelMatchFinder;

impl LevelMatchFinder {
    pub fn new() -> Self {
        Self
    }
}

impl MatchFinder for LevelMatchFinder {
    fn find_match(
        &self,
        anchor: &PlayerData,
        pool: &PlayerPool,
        options: &MatchmakingOptions,
    ) -> Vec<PlayerData> {
        let capacity = options.max_players_in_match.max(1);
        let mut group = Vec::with_capacity(capacity.min(pool.len() + 1));
        group.push(anchor.clone());

        for entry in pool.iter() {
            if group.len() >= capacity {
                break;
            }
            let candidate = &entry.player;
            if candidate.id == anchor.id {
                continue;
            }
            if self.is_compatible(anchor, candidate, options) {
                group.push(candidate.clone());
            }
        }

        group
    }

    fn is_compatible(
        &self,
        anchor: &PlayerData,
        candidate: &PlayerData,
        options: &MatchmakingOptions,
    ) -> bool {
        levels_within_tolerance(anchor.level, candidate.level, options.max_level_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::pool::QueueEntry;
    use crate::utils::{add_duration, current_timestamp};
    use std::time::Duration;

    fn pool_with(levels: &[(&str, i64)]) -> PlayerPool {
        let mut pool = PlayerPool::new();
        let now = current_timestamp();
        for (i, (id, level)) in levels.iter().enumerate() {
            let created_at = add_duration(now, Duration::from_millis(i as u64));
            pool.insert(QueueEntry::new(
                PlayerData::new(*id, *level, "US"),
                created_at,
                Duration::from_secs(10),
            ))
            .unwrap();
        }
        pool
    }

    fn options(max_players: usize, max_level_diff: u32) -> MatchmakingOptions {
        MatchmakingOptions::new(max_players, Duration::ZERO, Duration::ZERO, max_level_diff)
    }

    fn ids(group: &[PlayerData]) -> Vec<&str> {
        group.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_anchor_first_then_fifo_candidates() {
        let pool = pool_with(&[("1", 5), ("2", 5), ("3", 5), ("4", 5)]);
        let anchor = pool.get("3").unwrap().clone();

        let group = LevelMatchFinder::new().find_match(&anchor, &pool, &options(3, 0));
        assert_eq!(ids(&group), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_incompatible_levels_skipped() {
        let pool = pool_with(&[("1", 1), ("2", 1), ("3", 3), ("4", 1)]);
        let anchor = pool.get("4").unwrap().clone();

        let group = LevelMatchFinder::new().find_match(&anchor, &pool, &options(3, 1));
        assert_eq!(ids(&group), vec!["4", "1", "2"]);
    }

    #[test]
    fn test_level_difference_is_symmetric() {
        // Anchor above the candidate must be judged the same as below it
        let pool = pool_with(&[("low", 1), ("high", 5)]);
        let anchor = pool.get("high").unwrap().clone();

        let group = LevelMatchFinder::new().find_match(&anchor, &pool, &options(2, 1));
        assert_eq!(ids(&group), vec!["high"]);

        let anchor = pool.get("low").unwrap().clone();
        let group = LevelMatchFinder::new().find_match(&anchor, &pool, &options(2, 1));
        assert_eq!(ids(&group), vec!["low"]);
    }

    #[test]
    fn test_partial_group_when_candidates_run_out() {
        let pool = pool_with(&[("1", 1), ("2", 9)]);
        let anchor = pool.get("1").unwrap().clone();

        let group = LevelMatchFinder::new().find_match(&anchor, &pool, &options(10, 2));
        assert_eq!(ids(&group), vec!["1"]);
    }

    #[test]
    fn test_anchor_not_in_pool() {
        let pool = pool_with(&[("1", 1), ("2", 1)]);
        let anchor = PlayerData::new("outside", 1, "FI");

        let group = LevelMatchFinder::new().find_match(&anchor, &pool, &options(2, 0));
        assert_eq!(ids(&group), vec!["outside", "1"]);
    }

    #[test]
    fn test_single_player_match() {
        let pool = pool_with(&[("1", 1), ("2", 1)]);
        let anchor = pool.get("2").unwrap().clone();

        let group = LevelMatchFinder::new().find_match(&anchor, &pool, &options(1, 0));
        assert_eq!(ids(&group), vec!["2"]);
    }
}
