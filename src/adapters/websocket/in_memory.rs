//! In-memory transport for tests and headless harnesses.
//!
//! Every `connect` produces a [`ServerEnd`] that the test drives: push
//! frames to the client, read what the client sent, fail or close the
//! stream. Handshakes can be gated so a connection stays in `Connecting`
//! until the test releases it.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It never touches the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc as tokio_mpsc, Semaphore};

use crate::ports::{TransportChannel, TransportConnector, TransportError};

/// Server side of one in-memory connection.
pub struct ServerEnd {
    url: String,
    to_client: mpsc::UnboundedSender<Result<String, TransportError>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    /// URL the client asked for.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Pushes a raw text frame. Returns false if the client is gone.
    pub fn push(&self, frame: impl Into<String>) -> bool {
        self.to_client.unbounded_send(Ok(frame.into())).is_ok()
    }

    /// Pushes a JSON frame.
    pub fn push_json(&self, value: &Value) -> bool {
        self.push(value.to_string())
    }

    /// Injects a transport error into the client's inbound stream.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.to_client
            .unbounded_send(Err(TransportError::Receive(reason.into())))
            .is_ok()
    }

    /// Ends the client's inbound stream, as a clean server close would.
    pub fn close(&self) {
        self.to_client.close_channel();
    }

    /// Waits for the next frame the client sent.
    ///
    /// Returns `None` once the client side is dropped.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Returns a frame the client already sent, without waiting.
    pub fn try_next_sent(&mut self) -> Option<String> {
        self.from_client.try_next().ok().flatten()
    }

    /// Returns true while the client still holds its end of the transport.
    pub fn is_client_connected(&self) -> bool {
        !self.to_client.is_closed()
    }
}

/// Connector handing out in-memory transports.
pub struct InMemoryConnector {
    accepted_tx: tokio_mpsc::UnboundedSender<ServerEnd>,
    accepted_rx: tokio::sync::Mutex<tokio_mpsc::UnboundedReceiver<ServerEnd>>,
    refuse: AtomicBool,
    gate: Option<Semaphore>,
    attempts: Mutex<Vec<String>>,
}

impl InMemoryConnector {
    /// Creates a connector whose handshakes complete immediately.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a connector whose handshakes wait for [`Self::release_handshake`].
    pub fn gated() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        let (accepted_tx, accepted_rx) = tokio_mpsc::unbounded_channel();
        Self {
            accepted_tx,
            accepted_rx: tokio::sync::Mutex::new(accepted_rx),
            refuse: AtomicBool::new(false),
            gate,
            attempts: Mutex::new(Vec::new()),
        }
    }

    // === Test Helpers ===

    /// Makes subsequent handshakes fail (or succeed again).
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Lets one gated handshake complete.
    pub fn release_handshake(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Waits for the next completed handshake and returns its server end.
    pub async fn accept(&self) -> Option<ServerEnd> {
        self.accepted_rx.lock().await.recv().await
    }

    /// URLs of every connect attempt, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportConnector for InMemoryConnector {
    async fn connect(&self, url: &str) -> Result<TransportChannel, TransportError> {
        self.attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(url.to_string());

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            permit.forget();
        }

        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (to_client, client_inbound) = mpsc::unbounded();
        let (client_outbound, from_client) = mpsc::unbounded::<String>();

        let server = ServerEnd {
            url: url.to_string(),
            to_client,
            from_client,
        };
        self.accepted_tx
            .send(server)
            .map_err(|_| TransportError::Connect("in-memory server dropped".to_string()))?;

        let sink = client_outbound.sink_map_err(|e| TransportError::Send(e.to_string()));
        Ok(TransportChannel::new(Box::pin(sink), Box::pin(client_inbound)))
    }
}
