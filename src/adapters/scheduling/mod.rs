//! Frame scheduler adapters.
//!
//! - [`interval`] - Fixed-rate Tokio clock for headless consumers
//! - [`manual`] - Test-driven frames

pub mod interval;
pub mod manual;

pub use interval::{IntervalFrameScheduler, DEFAULT_FRAME_INTERVAL};
pub use manual::ManualFrameScheduler;
