//! TransportConnector port - Interface for opening a telemetry transport.
//!
//! The connection manager never talks to a socket library directly. It asks
//! a connector for a [`TransportChannel`]: a sink of outbound text frames and
//! a stream of inbound text frames. Protocol-level traffic (ping/pong, close
//! handshakes) stays inside the adapter.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Sink, Stream};
use thiserror::Error;

/// Errors raised by a transport.
///
/// These never reach consumers; the connection manager turns them into a
/// status transition to `Errored`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),
}

/// Outbound half of a transport.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a transport. The stream ends when the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An established transport, split into its two directions.
pub struct TransportChannel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl TransportChannel {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Port for establishing transports to telemetry endpoints.
///
/// # Example
///
/// ```ignore
/// let channel = connector.connect("ws://localhost:8000/ws?game=snake").await?;
/// ```
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Performs the handshake and returns the open channel.
    async fn connect(&self, url: &str) -> Result<TransportChannel, TransportError>;
}
