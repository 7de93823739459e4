//! Game enum naming the environments the backend can train and run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// An environment hosted by the RL backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    Snake,
    Pong,
    #[default]
    Tango,
}

impl Game {
    /// Returns all games in menu order.
    pub fn all() -> &'static [Game] {
        &[Game::Snake, Game::Pong, Game::Tango]
    }

    /// Returns the identifier used in query strings and control frames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Game::Snake => "snake",
            Game::Pong => "pong",
            Game::Tango => "tango",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Game {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("game"));
        }
        Game::all()
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::unknown_value("game", trimmed))
    }
}
