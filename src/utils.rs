//! Utility functions for the matchmaking service

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Generate a new unique competition ID
pub fn generate_competition_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Add a std duration to a timestamp, saturating at the maximum representable time
pub fn add_duration(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time elapsed since `since`, zero if `since` lies in the future
pub fn elapsed_since(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

/// Calculate the absolute difference between two levels
pub fn level_difference(level1: i64, level2: i64) -> u64 {
    level1.abs_diff(level2)
}

/// Check if two levels are within the given tolerance
pub fn levels_within_tolerance(level1: i64, level2: i64, tolerance: u32) -> bool {
    level_difference(level1, level2) <= u64::from(tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_competition_id();
        let id2 = generate_competition_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_level_difference() {
        assert_eq!(level_difference(5, 3), 2);
        assert_eq!(level_difference(3, 5), 2);
        assert_eq!(level_difference(4, 4), 0);
        assert_eq!(level_difference(i64::MIN, i64::MAX), u64::MAX);
    }

    #[test]
    fn test_levels_within_tolerance() {
        assert!(levels_within_tolerance(1, 2, 1));
        assert!(levels_within_tolerance(2, 1, 1));
        assert!(!levels_within_tolerance(1, 3, 1));
        assert!(!levels_within_tolerance(3, 1, 1));
        assert!(levels_within_tolerance(7, 7, 0));
    }

    #[test]
    fn test_add_duration_and_elapsed() {
        let now = current_timestamp();
        let later = add_duration(now, Duration::from_secs(2));
        assert_eq!(elapsed_since(now, later), Duration::from_secs(2));
        assert_eq!(elapsed_since(later, now), Duration::ZERO);
        assert_eq!(add_duration(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
