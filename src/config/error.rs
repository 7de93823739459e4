//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid backend host '{0}': expected host[:port] without scheme or path")]
    InvalidHost(String),

    #[error("Frame interval must be between 1 and 1000 ms")]
    InvalidFrameInterval,

    #[error("Connect timeout must be between 1 and 300 seconds")]
    InvalidConnectTimeout,

    #[error("Invalid log filter: {0}")]
    InvalidLogLevel(String),
}
