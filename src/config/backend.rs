//! Backend configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::Game;
use crate::domain::telemetry::{FeedEndpoint, FeedKind};

/// Where the RL backend lives and what to watch on startup
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend `host[:port]`, no scheme
    #[serde(default = "default_host")]
    pub host: String,

    /// Game selected on startup
    #[serde(default)]
    pub game: Game,

    /// Feed opened on startup
    #[serde(default)]
    pub feed: FeedKind,
}

impl BackendConfig {
    /// Endpoint of the startup feed
    pub fn endpoint(&self) -> Result<FeedEndpoint, ValidationError> {
        FeedEndpoint::new(self.host.clone(), self.feed)
            .map(|endpoint| endpoint.with_game(self.game))
            .map_err(|_| ValidationError::InvalidHost(self.host.clone()))
    }

    /// Validate backend configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingRequired("backend.host"));
        }
        self.endpoint().map(|_| ())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            game: Game::default(),
            feed: FeedKind::default(),
        }
    }
}

fn default_host() -> String {
    "localhost:8000".to_string()
}
