//! Matchmaking service façade
//!
//! Owns the configuration, the player pool and the scheduler state. Matches
//! are produced on two paths: synchronously by [`MatchmakingService::join`]
//! when a full group can be formed, and by the expiry scheduler for players
//! whose entry timed out. Both paths take the same pool lock and both release
//! it before a result leaves the service.

use crate::config::MatchmakingOptions;
use crate::error::MatchmakingError;
use crate::metrics::MetricsCollector;
use crate::queue::{LevelMatchFinder, MatchFinder, PlayerPool, QueueEntry};
use crate::scheduler::expiry::{RunningGuard, SchedulerHandle};
use crate::scheduler::MatchListener;
use crate::types::{MatchSource, MatchmakingResult, PlayerData};
use crate::utils::{current_timestamp, elapsed_since};
use chrono::{DateTime, Utc};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Snapshot of queue state and totals since the service was created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Players currently waiting
    pub players_waiting: usize,
    /// How long the oldest waiting player has been queued
    pub oldest_wait: Option<Duration>,
    /// Total players accepted into the queue
    pub players_queued: u64,
    /// Joins rejected because the player was already queued
    pub duplicate_joins: u64,
    /// Full matches completed on join
    pub immediate_matches: u64,
    /// Matches forced by the expiry scheduler
    pub forced_matches: u64,
    /// Total players that left the queue through a match
    pub players_matched: u64,
}

struct ServiceInner {
    options: MatchmakingOptions,
    pool: Mutex<PlayerPool>,
    match_finder: Arc<dyn MatchFinder>,
    metrics: Arc<MetricsCollector>,
    stats: RwLock<QueueStats>,
    scheduler_running: Arc<AtomicBool>,
}

/// The matchmaking service.
///
/// Cheap to clone; clones share the same pool.
#[derive(Clone)]
pub struct MatchmakingService {
    inner: Arc<ServiceInner>,
}

impl MatchmakingService {
    /// Create a service with the level-based match finder
    pub fn new(options: MatchmakingOptions) -> Result<Self, MatchmakingError> {
        let metrics = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_components(options, Arc::new(LevelMatchFinder::new()), metrics)
    }

    /// Create a service with a custom match finder and metrics collector
    pub fn with_components(
        options: MatchmakingOptions,
        match_finder: Arc<dyn MatchFinder>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, MatchmakingError> {
        options.validate()?;

        info!(
            "Creating matchmaking service - max_players: {}, max_level_diff: {}, interval: {}ms, timeout: {}ms",
            options.max_players_in_match,
            options.max_level_diff,
            options.match_interval.as_millis(),
            options.entry_timeout.as_millis()
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                options,
                pool: Mutex::new(PlayerPool::new()),
                match_finder,
                metrics,
                stats: RwLock::new(QueueStats::default()),
                scheduler_running: Arc::new(AtomicBool::new(false)),
            }),
        })
    }

    /// Join a player to the queue.
    ///
    /// Returns a found match when the player completes a full group, otherwise
    /// the player stays queued and `match_found` is false.
    pub fn join(&self, player: PlayerData) -> Result<MatchmakingResult, MatchmakingError> {
        let options = &self.inner.options;

        let (matched, players_waiting, joined_at) = {
            let mut pool = self.lock_pool()?;
            let now = current_timestamp();

            if let Err(e) = pool.insert(QueueEntry::new(player.clone(), now, options.entry_timeout))
            {
                drop(pool);
                debug!("Rejected join for '{}': already queued", player.id);
                self.inner.metrics.record_duplicate_join();
                self.update_stats(|stats| stats.duplicate_joins += 1);
                return Err(e);
            }

            let matched = if pool.len() < options.max_players_in_match {
                None
            } else {
                let group = self
                    .inner
                    .match_finder
                    .find_match(&player, &pool, options);
                if group.len() == options.max_players_in_match {
                    let removed = pool.remove_all(&group);
                    Some((group, removed))
                } else {
                    None
                }
            };

            self.inner.metrics.set_players_waiting(pool.len());
            (matched, pool.len(), now)
        };

        self.update_stats(|stats| stats.players_queued += 1);
        self.inner.metrics.record_player_queued();

        match matched {
            Some((group, removed)) => {
                info!(
                    "Match found on join - anchor: '{}', players: {}, still waiting: {}",
                    player.id,
                    group.len(),
                    players_waiting
                );
                self.record_match(MatchSource::Immediate, &removed, joined_at);
                Ok(MatchmakingResult::found(group))
            }
            None => {
                debug!(
                    "Player '{}' (level {}) queued, {} waiting",
                    player.id, player.level, players_waiting
                );
                Ok(MatchmakingResult::not_found())
            }
        }
    }

    /// Start the expiry scheduler.
    ///
    /// Forced matches are handed to `listener`. Fails if a scheduler started
    /// from this service is still running. Must be called from within a tokio
    /// runtime.
    pub fn start<L>(&self, listener: L) -> Result<SchedulerHandle, MatchmakingError>
    where
        L: MatchListener + 'static,
    {
        let guard = RunningGuard::acquire(&self.inner.scheduler_running)
            .ok_or(MatchmakingError::SchedulerAlreadyRunning)?;

        Ok(SchedulerHandle::spawn(self.clone(), Arc::new(listener), guard))
    }

    /// Force matches for every expired entry present when the pass began.
    ///
    /// Entries are taken oldest first; each forced group is handed to the
    /// listener after the pool lock is released. Returns the number of
    /// matches emitted.
    pub fn run_expiry_pass(&self, listener: &dyn MatchListener) -> Result<usize, MatchmakingError> {
        let options = &self.inner.options;
        let now = current_timestamp();
        let mut horizon: Option<u64> = None;
        let mut emitted = 0;

        loop {
            let (group, removed, players_waiting) = {
                let mut pool = self.lock_pool()?;
                // Players joined by the listener during this pass wait for the next one
                let limit = *horizon.get_or_insert(pool.last_sequence());

                let Some(oldest) = pool.oldest() else {
                    break;
                };
                if oldest.sequence > limit || !oldest.is_expired(now) {
                    break;
                }

                let anchor = oldest.player.clone();
                let group = self
                    .inner
                    .match_finder
                    .find_match(&anchor, &pool, options);
                let removed = pool.remove_all(&group);
                self.inner.metrics.set_players_waiting(pool.len());
                (group, removed, pool.len())
            };

            info!(
                "Forced match - anchor: '{}', players: {}/{}, still waiting: {}",
                group[0].id,
                group.len(),
                options.max_players_in_match,
                players_waiting
            );
            self.record_match(MatchSource::Forced, &removed, now);

            listener.on_match_found(MatchmakingResult::found(group));
            emitted += 1;
        }

        Ok(emitted)
    }

    /// Number of queued players
    pub fn size(&self) -> Result<usize, MatchmakingError> {
        Ok(self.lock_pool()?.len())
    }

    /// Whether the player is currently queued
    pub fn contains(&self, player_id: &str) -> Result<bool, MatchmakingError> {
        Ok(self.lock_pool()?.contains(player_id))
    }

    /// Queued players, oldest first
    pub fn queued_players(&self) -> Result<Vec<PlayerData>, MatchmakingError> {
        let snapshot = self.lock_pool()?.snapshot();
        Ok(snapshot.into_iter().map(|entry| entry.player).collect())
    }

    /// Whether the pool's index and ordering agree
    pub fn is_consistent(&self) -> Result<bool, MatchmakingError> {
        Ok(self.lock_pool()?.is_consistent())
    }

    /// Current queue statistics
    pub fn stats(&self) -> Result<QueueStats, MatchmakingError> {
        let (players_waiting, oldest_created_at) = {
            let pool = self.lock_pool()?;
            (pool.len(), pool.oldest().map(|entry| entry.created_at))
        };

        let mut stats = self
            .inner
            .stats
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("stats"))?
            .clone();
        stats.players_waiting = players_waiting;
        stats.oldest_wait = oldest_created_at.map(|at| elapsed_since(at, current_timestamp()));
        Ok(stats)
    }

    pub fn options(&self) -> &MatchmakingOptions {
        &self.inner.options
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.inner.metrics.clone()
    }

    fn lock_pool(&self) -> Result<MutexGuard<'_, PlayerPool>, MatchmakingError> {
        self.inner
            .pool
            .lock()
            .map_err(|_| MatchmakingError::lock_poisoned("player pool"))
    }

    fn update_stats(&self, update: impl FnOnce(&mut QueueStats)) {
        match self.inner.stats.write() {
            Ok(mut stats) => update(&mut stats),
            Err(_) => warn!("Failed to acquire stats lock, skipping stats update"),
        }
    }

    fn record_match(
        &self,
        source: MatchSource,
        removed: &[QueueEntry],
        matched_at: DateTime<Utc>,
    ) {
        let wait_times: Vec<Duration> = removed
            .iter()
            .map(|entry| elapsed_since(entry.created_at, matched_at))
            .collect();

        self.inner.metrics.record_match(source, &wait_times);
        self.update_stats(|stats| {
            match source {
                MatchSource::Immediate => stats.immediate_matches += 1,
                MatchSource::Forced => stats.forced_matches += 1,
            }
            stats.players_matched += removed.len() as u64;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(max_players: usize, max_level_diff: u32) -> MatchmakingOptions {
        MatchmakingOptions::new(max_players, Duration::ZERO, Duration::ZERO, max_level_diff)
    }

    fn player(id: &str, level: i64) -> PlayerData {
        PlayerData::new(id, level, "US")
    }

    fn recording_listener() -> (Arc<Mutex<Vec<MatchmakingResult>>>, impl MatchListener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let seen = seen.clone();
            move |result: MatchmakingResult| seen.lock().unwrap().push(result)
        };
        (seen, listener)
    }

    #[test]
    fn test_invalid_options_rejected() {
        let result = MatchmakingService::new(options(0, 0));
        assert!(matches!(
            result,
            Err(MatchmakingError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_join_forms_group_every_third_player() {
        let service = MatchmakingService::new(options(3, 0)).unwrap();

        let results: Vec<_> = (1..=6)
            .map(|i| service.join(player(&i.to_string(), 1)).unwrap())
            .collect();

        let found: Vec<_> = results.iter().map(|r| r.match_found).collect();
        assert_eq!(found, vec![false, false, true, false, false, true]);
        assert_eq!(results[2].player_ids(), vec!["3", "1", "2"]);
        assert_eq!(results[5].player_ids(), vec!["6", "4", "5"]);
        assert!(results[0].players.is_empty());
        assert_eq!(service.size().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let service = MatchmakingService::new(options(3, 0)).unwrap();

        assert!(!service.join(player("1", 1)).unwrap().match_found);
        let err = service.join(player("1", 1)).unwrap_err();
        assert_eq!(
            err,
            MatchmakingError::AlreadyInMatchmaking {
                player_id: "1".to_string()
            }
        );
        assert_eq!(service.size().unwrap(), 1);
        assert!(service.is_consistent().unwrap());
        assert_eq!(service.stats().unwrap().duplicate_joins, 1);
    }

    #[test]
    fn test_player_can_rejoin_after_match() {
        let service = MatchmakingService::new(options(2, 0)).unwrap();

        service.join(player("1", 1)).unwrap();
        assert!(service.join(player("2", 1)).unwrap().match_found);
        assert!(!service.contains("1").unwrap());
        assert!(service.join(player("1", 1)).is_ok());
    }

    #[test]
    fn test_level_clusters_never_mix() {
        let service = MatchmakingService::new(options(3, 1)).unwrap();

        let levels = [1, 1, 3, 1, 4, 4];
        let results: Vec<_> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| service.join(player(&(i + 1).to_string(), *level)).unwrap())
            .collect();

        let found: Vec<_> = results.iter().map(|r| r.match_found).collect();
        assert_eq!(found, vec![false, false, false, true, false, true]);
        assert_eq!(results[3].player_ids(), vec!["4", "1", "2"]);
        assert_eq!(results[5].player_ids(), vec!["6", "3", "5"]);
    }

    #[test]
    fn test_single_player_matches_are_immediate() {
        let service = MatchmakingService::new(options(1, 0)).unwrap();

        let result = service.join(player("solo", 9)).unwrap();
        assert!(result.match_found);
        assert_eq!(result.player_ids(), vec!["solo"]);
        assert_eq!(service.size().unwrap(), 0);
    }

    #[test]
    fn test_expiry_pass_forces_partial_match() {
        let service = MatchmakingService::new(options(3, 0)).unwrap();
        service.join(player("1", 1)).unwrap();
        service.join(player("2", 1)).unwrap();

        let (seen, listener) = recording_listener();
        let emitted = service.run_expiry_pass(&listener).unwrap();

        assert_eq!(emitted, 1);
        let seen = seen.lock().unwrap();
        assert!(seen[0].match_found);
        assert_eq!(seen[0].player_ids(), vec!["1", "2"]);
        assert_eq!(service.size().unwrap(), 0);
    }

    #[test]
    fn test_expiry_pass_emits_in_join_order() {
        let service = MatchmakingService::new(options(3, 0)).unwrap();
        for (id, level) in [("a", 1), ("b", 5), ("c", 9), ("d", 5)] {
            service.join(player(id, level)).unwrap();
        }

        let (seen, listener) = recording_listener();
        assert_eq!(service.run_expiry_pass(&listener).unwrap(), 3);

        let anchors: Vec<_> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.players[0].id.clone())
            .collect();
        assert_eq!(anchors, vec!["a", "b", "c"]);
        assert_eq!(service.stats().unwrap().forced_matches, 3);
    }

    #[test]
    fn test_expiry_pass_leaves_fresh_entries() {
        let service = MatchmakingService::new(MatchmakingOptions::new(
            3,
            Duration::ZERO,
            Duration::from_secs(60),
            0,
        ))
        .unwrap();
        service.join(player("1", 1)).unwrap();

        let (seen, listener) = recording_listener();
        assert_eq!(service.run_expiry_pass(&listener).unwrap(), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(service.size().unwrap(), 1);
    }

    #[test]
    fn test_listener_may_rejoin_during_pass() {
        let service = MatchmakingService::new(options(2, 0)).unwrap();
        service.join(player("1", 1)).unwrap();

        let rejoining = {
            let service = service.clone();
            move |result: MatchmakingResult| {
                for p in result.players {
                    service.join(p).unwrap();
                }
            }
        };

        // The rejoined player is left for the next pass instead of looping forever
        assert_eq!(service.run_expiry_pass(&rejoining).unwrap(), 1);
        assert!(service.contains("1").unwrap());
    }

    #[test]
    fn test_stats_track_both_paths() {
        let service = MatchmakingService::new(options(2, 0)).unwrap();
        service.join(player("1", 1)).unwrap();
        service.join(player("2", 1)).unwrap();
        service.join(player("3", 1)).unwrap();

        let (_seen, listener) = recording_listener();
        service.run_expiry_pass(&listener).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.players_queued, 3);
        assert_eq!(stats.immediate_matches, 1);
        assert_eq!(stats.forced_matches, 1);
        assert_eq!(stats.players_matched, 3);
        assert_eq!(stats.players_waiting, 0);
        assert_eq!(stats.oldest_wait, None);
    }
}
