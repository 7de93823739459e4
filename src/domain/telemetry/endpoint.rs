//! Telemetry endpoint addressing.
//!
//! Inference telemetry lives at `ws://<host>/ws[?game=<id>]`, training
//! telemetry at `ws://<host>/ws/training[?game=<id>]`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Game, ValidationError};

/// Which of the two logically distinct feeds to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    #[default]
    Inference,
    Training,
}

impl FeedKind {
    fn path(&self) -> &'static str {
        match self {
            FeedKind::Inference => "/ws",
            FeedKind::Training => "/ws/training",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Inference => f.write_str("inference"),
            FeedKind::Training => f.write_str("training"),
        }
    }
}

/// Address of one telemetry feed on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    host: String,
    kind: FeedKind,
    game: Option<Game>,
}

impl FeedEndpoint {
    /// Creates an endpoint for `host` (`hostname[:port]`, no scheme).
    pub fn new(host: impl Into<String>, kind: FeedKind) -> Result<Self, ValidationError> {
        let host = host.into();
        let trimmed = host.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("host"));
        }
        if trimmed.contains("://") {
            return Err(ValidationError::invalid_format(
                "host",
                "must not include a scheme",
            ));
        }
        if trimmed.contains('/') || trimmed.contains('?') {
            return Err(ValidationError::invalid_format(
                "host",
                "must not include a path or query",
            ));
        }

        Ok(Self {
            host: trimmed.to_string(),
            kind,
            game: None,
        })
    }

    /// Scopes the feed to one game.
    pub fn with_game(mut self, game: Game) -> Self {
        self.game = Some(game);
        self
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn game(&self) -> Option<Game> {
        self.game
    }

    /// Renders the WebSocket URL.
    pub fn url(&self) -> String {
        match self.game {
            Some(game) => format!("ws://{}{}?game={}", self.host, self.kind.path(), game),
            None => format!("ws://{}{}", self.host, self.kind.path()),
        }
    }
}

impl fmt::Display for FeedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}
