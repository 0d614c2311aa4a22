//! Listener interface for matches reported outside of `join`

use crate::types::MatchmakingResult;
use tokio::sync::mpsc;
use tracing::warn;

/// Receives matches found by the expiry scheduler.
///
/// Called synchronously from the scheduler task, never while the pool lock is
/// held, so implementations may call back into the service.
pub trait MatchListener: Send + Sync {
    fn on_match_found(&self, result: MatchmakingResult);
}

impl<F> MatchListener for F
where
    F: Fn(MatchmakingResult) + Send + Sync,
{
    fn on_match_found(&self, result: MatchmakingResult) {
        self(result)
    }
}

impl MatchListener for mpsc::UnboundedSender<MatchmakingResult> {
    fn on_match_found(&self, result: MatchmakingResult) {
        if self.send(result).is_err() {
            warn!("Match listener channel closed, dropping match result");
        }
    }
}
