//! Inbound telemetry frames and their normalized form.
//!
//! The backend pushes JSON objects of the shape
//! `{ type?: string, data?: any, state?: any, seq?: number }`. Older
//! producers only send `{ state: ... }`; normalization maps that shorthand
//! onto `type = "state", data = state` exactly once, at ingestion.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::Timestamp;

/// Message kind used for untyped state payloads.
pub const STATE_KIND: &str = "state";

/// Why an inbound frame could not be turned into a message.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Frame must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Frame fields have the wrong shape: {0}")]
    InvalidFields(#[source] serde_json::Error),
}

/// Raw inbound frame exactly as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl WireFrame {
    /// Parses a text frame.
    ///
    /// Only JSON objects are accepted; `seq` must be a non-negative integer
    /// when present.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text).map_err(FrameError::InvalidJson)?;
        if !value.is_object() {
            return Err(FrameError::NotAnObject(json_type_name(&value)));
        }
        serde_json::from_value(value).map_err(FrameError::InvalidFields)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A normalized telemetry message, the unit buffered and delivered.
///
/// Equality compares content only; two deliveries of the same frame are
/// equal whenever they arrived.
#[derive(Debug, Clone)]
pub struct TelemetryMessage {
    /// Routing tag. `None` only when the frame carried neither `type` nor `state`.
    pub kind: Option<String>,
    /// Payload; `Value::Null` when the frame carried none.
    pub data: Value,
    pub seq: Option<u64>,
    /// When the frame came off the transport.
    pub received_at: Timestamp,
}

impl PartialEq for TelemetryMessage {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.data == other.data && self.seq == other.seq
    }
}

impl TelemetryMessage {
    /// Creates a typed message with no sequence number.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: Some(kind.into()),
            data,
            seq: None,
            received_at: Timestamp::now(),
        }
    }

    /// Creates a state message with no sequence number.
    pub fn state(data: Value) -> Self {
        Self::new(STATE_KIND, data)
    }

    /// Sets the sequence number.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Returns true if this message routes through the state path.
    pub fn is_state(&self) -> bool {
        self.kind.as_deref() == Some(STATE_KIND)
    }

    /// Time since the frame was received.
    pub fn age(&self) -> Duration {
        Timestamp::now().duration_since(&self.received_at)
    }

    /// Returns the routing tag, or `""` when absent.
    pub fn kind_str(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }
}

impl From<WireFrame> for TelemetryMessage {
    fn from(frame: WireFrame) -> Self {
        let (kind, data) = match (frame.kind, frame.state) {
            (None, Some(state)) => (Some(STATE_KIND.to_string()), Some(state)),
            (kind, _) => (kind, frame.data),
        };

        Self {
            kind,
            data: data.unwrap_or(Value::Null),
            seq: frame.seq,
            received_at: Timestamp::now(),
        }
    }
}
