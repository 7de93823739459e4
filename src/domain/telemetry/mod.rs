//! Telemetry module - the message model of the real-time feed.
//!
//! - `message` - inbound frames and normalization
//! - `pending` - single-slot buffer with staleness rejection
//! - `control` - outbound control frames
//! - `endpoint` - feed URL shapes

mod control;
mod endpoint;
mod message;
mod pending;

pub use control::{ActionCommand, ConfigValue, ControlMessage, InferenceAction, TypedControl};
pub use endpoint::{FeedEndpoint, FeedKind};
pub use message::{FrameError, TelemetryMessage, WireFrame, STATE_KIND};
pub use pending::{Admission, PendingBuffer};
