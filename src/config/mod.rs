//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `RL_TELEMETRY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use rl_telemetry::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Watching {}", config.backend.endpoint().unwrap());
//! ```

mod backend;
mod error;
mod feed;
mod logging;

pub use backend::BackendConfig;
pub use error::{ConfigError, ValidationError};
pub use feed::FeedConfig;
pub use logging::{LogFormat, LoggingConfig};

use serde::Deserialize;

use crate::application::SessionSettings;

/// Root application configuration
///
/// Every section has defaults, so an empty environment is a valid
/// configuration pointing at a local backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Backend location and startup feed
    #[serde(default)]
    pub backend: BackendConfig,

    /// Frame cadence and connection timing
    #[serde(default)]
    pub feed: FeedConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `RL_TELEMETRY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `RL_TELEMETRY__BACKEND__HOST=10.0.0.5:8000` -> `backend.host = 10.0.0.5:8000`
    /// - `RL_TELEMETRY__FEED__FRAME_INTERVAL_MS=33` -> `feed.frame_interval_ms = 33`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("RL_TELEMETRY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.backend.validate()?;
        self.feed.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Settings for the dashboard session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::new(self.backend.host.clone(), self.backend.game)
            .with_feed_options(self.feed.feed_options())
    }
}
