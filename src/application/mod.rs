//! Application layer - the services that move telemetry.
//!
//! ```text
//! TransportConnector ─▶ ConnectionManager ─▶ MessageCoalescer ─▶ LocalState
//!                              ▲                               └▶ DispatchRegistry ─▶ handlers
//!                       ControlChannel
//! ```
//!
//! [`TelemetryFeed`] composes one of each per feed; [`DashboardSession`]
//! composes the inference and training feeds of a dashboard.

mod coalescer;
mod connection_manager;
mod control_channel;
mod dispatch_registry;
mod feed;
mod session;

pub use coalescer::{FeedStats, MessageCoalescer};
pub use connection_manager::{ConnectionManager, DEFAULT_CONNECT_TIMEOUT};
pub use control_channel::ControlChannel;
pub use dispatch_registry::{DispatchOutcome, DispatchRegistry};
pub use feed::{ConsumptionMode, LocalState, TelemetryFeed, TelemetryFeedOptions};
pub use session::{DashboardSession, SessionError, SessionMode, SessionSettings};
