//! RL Telemetry - real-time state synchronization for the RL dashboard.
//!
//! Owns the WebSocket feeds from the training backend, coalesces inbound
//! telemetry to the consumer's frame rate with staleness rejection, and
//! routes delivered messages either to a single local consumer or through
//! a shared dispatch registry.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
