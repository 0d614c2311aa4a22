//! Expiry scheduler guaranteeing an upper bound on queue wait time
//!
//! Matches forced by the scheduler are reported to a registered
//! [`MatchListener`] instead of being returned to a caller.

pub mod expiry;
pub mod listener;

pub use expiry::SchedulerHandle;
pub use listener::MatchListener;
