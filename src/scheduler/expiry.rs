//! Background task forcing matches for players who waited too long
//!
//! The task ticks every `match_interval` and runs one expiry pass per tick.
//! It is cancelled through a [`CancellationToken`]; [`SchedulerHandle::stop`]
//! waits for the task to exit so that no listener call happens afterwards.

use crate::scheduler::listener::MatchListener;
use crate::service::MatchmakingService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Clears the service's running flag when the scheduler task ends, however it ends
pub(crate) struct RunningGuard {
    flag: Arc<AtomicBool>,
}

impl RunningGuard {
    /// Claim the flag; `None` if a scheduler is already running
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Handle to a running expiry scheduler.
///
/// Dropping the handle cancels the task without waiting for it.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Spawn the scheduler task. Must be called from within a tokio runtime.
    pub(crate) fn spawn(
        service: MatchmakingService,
        listener: Arc<dyn MatchListener>,
        guard: RunningGuard,
    ) -> Self {
        let cancel = CancellationToken::new();
        let interval = service.options().match_interval;

        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _guard = guard;
                run_expiry_loop(service, listener, interval, cancel).await;
            })
        };

        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Whether the background task is still alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the scheduler and wait until the background task has exited.
    ///
    /// A tick already in progress completes first.
    pub async fn stop(mut self) {
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(()) => info!("Expiry scheduler stopped"),
                Err(e) if e.is_panic() => warn!("Expiry scheduler task panicked: {}", e),
                Err(e) => warn!("Expiry scheduler task ended abnormally: {}", e),
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_expiry_loop(
    service: MatchmakingService,
    listener: Arc<dyn MatchListener>,
    interval: Duration,
    cancel: CancellationToken,
) {
    // A zero interval degrades to yielding between passes
    let mut ticker = (!interval.is_zero()).then(|| {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    info!(
        "Expiry scheduler started ({}ms interval)",
        interval.as_millis()
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = next_tick(&mut ticker) => {}
        }

        match service.run_expiry_pass(listener.as_ref()) {
            Ok(0) => {}
            Ok(matches) => debug!("Expiry pass forced {} matches", matches),
            Err(e) => warn!("Expiry pass failed: {}", e),
        }
    }

    debug!("Expiry scheduler loop exited");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => tokio::task::yield_now().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_guard_is_exclusive() {
        let flag = Arc::new(AtomicBool::new(false));

        let guard = RunningGuard::acquire(&flag).unwrap();
        assert!(flag.load(Ordering::Acquire));
        assert!(RunningGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(RunningGuard::acquire(&flag).is_some());
    }
}
