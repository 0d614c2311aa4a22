//! Matchmaking options fixed for the lifetime of a service instance

use crate::error::MatchmakingError;
use std::time::Duration;

/// Runtime matchmaking options.
///
/// With the defaults a competition is attempted every 10s and an entry
/// expires after 20s, so nobody waits longer than roughly 30s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchmakingOptions {
    /// How many players take part in one competition
    pub max_players_in_match: usize,
    /// How often the expiry scheduler looks for timed out players
    pub match_interval: Duration,
    /// After this long a match is forced even if it is not full
    pub entry_timeout: Duration,
    /// Largest level gap allowed between an anchor and its candidates
    pub max_level_diff: u32,
}

impl Default for MatchmakingOptions {
    fn default() -> Self {
        Self {
            max_players_in_match: 10,
            match_interval: Duration::from_secs(10),
            entry_timeout: Duration::from_secs(20),
            max_level_diff: 2,
        }
    }
}

impl MatchmakingOptions {
    pub fn new(
        max_players_in_match: usize,
        match_interval: Duration,
        entry_timeout: Duration,
        max_level_diff: u32,
    ) -> Self {
        Self {
            max_players_in_match,
            match_interval,
            entry_timeout,
            max_level_diff,
        }
    }

    /// Reject options the core cannot work with
    pub fn validate(&self) -> Result<(), MatchmakingError> {
        if self.max_players_in_match == 0 {
            return Err(MatchmakingError::InvalidConfiguration {
                reason: "max_players_in_match must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Longest time a player can stay queued while the scheduler runs
    pub fn max_wait(&self) -> Duration {
        self.entry_timeout.saturating_add(self.match_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let options = MatchmakingOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.max_players_in_match, 10);
        assert_eq!(options.max_wait(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_players_rejected() {
        let options = MatchmakingOptions::new(0, Duration::ZERO, Duration::ZERO, 0);
        assert!(matches!(
            options.validate(),
            Err(MatchmakingError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_zero_durations_allowed() {
        let options = MatchmakingOptions::new(1, Duration::ZERO, Duration::ZERO, 0);
        assert!(options.validate().is_ok());
    }
}
