//! Configuration management for the matchmaker service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values for the matchmaking service.

pub mod app;
pub mod matchmaking;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, CompetitionSettings, MatchmakingSettings, ServiceSettings,
};
pub use matchmaking::MatchmakingOptions;
