//! WebSocket transport adapters.
//!
//! # Components
//!
//! - [`connector`] - Real WebSocket connections via tokio-tungstenite
//! - [`in_memory`] - Scripted transport for tests and headless harnesses

pub mod connector;
pub mod in_memory;

pub use connector::TungsteniteConnector;
pub use in_memory::{InMemoryConnector, ServerEnd};
