//! Domain layer containing the telemetry vocabulary and its rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (status, ids, games, errors)
//! - `telemetry` - Messages, control frames, endpoints, the pending buffer

pub mod foundation;
pub mod telemetry;
