//! Main application configuration
//!
//! This module defines the primary configuration structures for the matchmaker
//! service, including TOML file loading, environment variable loading and
//! validation.

use crate::config::matchmaking::MatchmakingOptions;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
    pub competition: CompetitionSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Players per competition
    pub max_players_in_match: usize,
    /// Expiry scheduler tick interval in milliseconds
    pub match_interval_ms: u64,
    /// Time after which a match is forced, in milliseconds
    pub entry_timeout_ms: u64,
    /// Maximum level difference between matched players
    pub max_level_diff: u32,
}

/// Settings for competitions created from matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionSettings {
    /// How long a competition runs after it is created
    pub duration_seconds: u64,
    /// Upper bound of competitions kept in memory
    pub max_competitions: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "matchmaker".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        let options = MatchmakingOptions::default();
        Self {
            max_players_in_match: options.max_players_in_match,
            match_interval_ms: options.match_interval.as_millis() as u64,
            entry_timeout_ms: options.entry_timeout.as_millis() as u64,
            max_level_diff: options.max_level_diff,
        }
    }
}

impl Default for CompetitionSettings {
    fn default() -> Self {
        Self {
            duration_seconds: 3600, // 1 hour
            max_competitions: 100_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; missing keys fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Matchmaking settings
        if let Ok(max_players) = env::var("MAX_PLAYERS_IN_MATCH") {
            config.matchmaking.max_players_in_match = max_players
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_PLAYERS_IN_MATCH value: {}", max_players))?;
        }
        if let Ok(interval) = env::var("MATCH_INTERVAL_MS") {
            config.matchmaking.match_interval_ms = interval
                .parse()
                .map_err(|_| anyhow!("Invalid MATCH_INTERVAL_MS value: {}", interval))?;
        }
        if let Ok(timeout) = env::var("ENTRY_TIMEOUT_MS") {
            config.matchmaking.entry_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid ENTRY_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(level_diff) = env::var("MAX_LEVEL_DIFF") {
            config.matchmaking.max_level_diff = level_diff
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_LEVEL_DIFF value: {}", level_diff))?;
        }

        // Competition settings
        if let Ok(duration) = env::var("COMPETITION_DURATION_SECONDS") {
            config.competition.duration_seconds = duration
                .parse()
                .map_err(|_| anyhow!("Invalid COMPETITION_DURATION_SECONDS value: {}", duration))?;
        }
        if let Ok(max) = env::var("MAX_COMPETITIONS") {
            config.competition.max_competitions = max
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_COMPETITIONS value: {}", max))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Runtime matchmaking options derived from the settings
    pub fn matchmaking_options(&self) -> MatchmakingOptions {
        MatchmakingOptions {
            max_players_in_match: self.matchmaking.max_players_in_match,
            match_interval: Duration::from_millis(self.matchmaking.match_interval_ms),
            entry_timeout: Duration::from_millis(self.matchmaking.entry_timeout_ms),
            max_level_diff: self.matchmaking.max_level_diff,
        }
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get competition duration as Duration
    pub fn competition_duration(&self) -> Duration {
        Duration::from_secs(self.competition.duration_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    config.matchmaking_options().validate()?;

    if config.competition.duration_seconds == 0 {
        return Err(anyhow!("Competition duration must be greater than 0"));
    }
    if config.competition.max_competitions == 0 {
        return Err(anyhow!("Max competitions must be greater than 0"));
    }

    Ok(())
}
