//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the telemetry layer to the outside world:
//! - `websocket` - Transport connectors (tokio-tungstenite, in-memory)
//! - `scheduling` - Frame schedulers (interval clock, manual)

pub mod scheduling;
pub mod websocket;

pub use scheduling::{IntervalFrameScheduler, ManualFrameScheduler};
pub use websocket::{InMemoryConnector, ServerEnd, TungsteniteConnector};
