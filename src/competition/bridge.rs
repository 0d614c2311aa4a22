//! Hands matches over to competition storage
//!
//! [`CompetitionBridge`] is a [`MatchListener`]: every found match is queued
//! to a worker task that creates the competition. Storage failures are logged
//! and never reach the matchmaking core.

use crate::competition::storage::CompetitionStorage;
use crate::scheduler::MatchListener;
use crate::types::{MatchmakingResult, PlayerId};
use crate::utils::{add_duration, current_timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Match listener that creates a competition for every found match
#[derive(Clone)]
pub struct CompetitionBridge {
    sender: mpsc::UnboundedSender<Vec<PlayerId>>,
}

impl CompetitionBridge {
    /// Spawn the worker task. It exits once every bridge clone is dropped.
    pub fn spawn(
        storage: Arc<dyn CompetitionStorage>,
        competition_duration: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(storage, competition_duration, receiver));
        (Self { sender }, worker)
    }
}

impl MatchListener for CompetitionBridge {
    fn on_match_found(&self, result: MatchmakingResult) {
        if !result.match_found {
            return;
        }
        if self.sender.send(result.player_ids()).is_err() {
            warn!(
                "Competition worker is gone, dropping match of {} players",
                result.players.len()
            );
        }
    }
}

async fn run_worker(
    storage: Arc<dyn CompetitionStorage>,
    competition_duration: Duration,
    mut receiver: mpsc::UnboundedReceiver<Vec<PlayerId>>,
) {
    debug!("Competition worker started");

    while let Some(players) = receiver.recv().await {
        let ends_at = add_duration(current_timestamp(), competition_duration);
        let player_count = players.len();

        match storage.create(players, ends_at).await {
            Ok(competition) => info!(
                "Competition {} created for {} players, ends at {}",
                competition.id, player_count, competition.ends_at
            ),
            Err(e) => error!(
                "Failed to create competition for {} players: {}",
                player_count, e
            ),
        }
    }

    debug!("Competition worker stopped");
}
