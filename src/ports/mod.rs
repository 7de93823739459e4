//! Ports - Interfaces at the seams of the telemetry layer.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application services and the outside world. Adapters implement these ports.
//!
//! ## Transport Ports
//!
//! - `TransportConnector` - Opens a transport to a feed URL
//!
//! ## Scheduling Ports
//!
//! - `FrameScheduler` - Single-slot deferral to the next frame
//!
//! ## Delivery Ports
//!
//! - `FrameListener` - Connection → coalescer
//! - `MessageSink` - Coalescer → consumption path
//! - `MessageHandler` - Dispatch registry → consumer

mod delivery;
mod frame_scheduler;
mod transport;

pub use delivery::{FnHandler, FrameListener, MessageHandler, MessageSink};
pub use frame_scheduler::{FrameHandle, FrameScheduler, FrameTask};
pub use transport::{FrameSink, FrameStream, TransportChannel, TransportConnector, TransportError};
