//! Feed configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::TelemetryFeedOptions;

/// Frame cadence and connection timing
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Frame period of the headless frame clock
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,

    /// Handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl FeedConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Options for building telemetry feeds
    pub fn feed_options(&self) -> TelemetryFeedOptions {
        TelemetryFeedOptions::default().with_connect_timeout(self.connect_timeout())
    }

    /// Validate feed configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=1000).contains(&self.frame_interval_ms) {
            return Err(ValidationError::InvalidFrameInterval);
        }
        if !(1..=300).contains(&self.connect_timeout_secs) {
            return Err(ValidationError::InvalidConnectTimeout);
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_frame_interval() -> u64 {
    16
}

fn default_connect_timeout() -> u64 {
    10
}
