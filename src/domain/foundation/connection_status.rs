//! ConnectionStatus enum tracking the lifecycle of a telemetry transport.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::StateMachine;

/// Lifecycle status of a telemetry connection.
///
/// `Closed` and `Errored` end a transport instance but not the manager that
/// owns it: a new `connect` moves either back to `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionStatus {
    /// Returns true if frames can be sent right now.
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }

    /// Returns true if a transport currently exists (handshaking or open).
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Open)
    }
}

impl StateMachine for ConnectionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, target),
            (Idle, Connecting)
                | (Connecting, Open)
                | (Connecting, Closed)
                | (Connecting, Errored)
                | (Open, Closed)
                | (Open, Errored)
                | (Closed, Connecting)
                | (Errored, Connecting)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionStatus::*;
        match self {
            Idle => vec![Connecting],
            Connecting => vec![Open, Closed, Errored],
            Open => vec![Closed, Errored],
            Closed => vec![Connecting],
            Errored => vec![Connecting],
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Idle => "Idle",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Open => "Open",
            ConnectionStatus::Closed => "Closed",
            ConnectionStatus::Errored => "Errored",
        };
        write!(f, "{}", s)
    }
}
