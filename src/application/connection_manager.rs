//! ConnectionManager - owns at most one transport to one feed URL.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──connect(url)──▶ Connecting ──handshake──▶ Open
//!                            │                      │
//!                            ├──error/timeout──▶ Errored ◀──error──┤
//!                            └──close──────────▶ Closed  ◀──close/EOF──┘
//! ```
//!
//! `Closed` and `Errored` end a transport instance, not the manager: the
//! next `connect` with a URL starts over. Nothing reconnects on its own.
//!
//! Every transport runs in its own Tokio task tagged with a generation
//! number. Tearing a transport down bumps the generation under the same
//! lock that guards frame delivery, so a superseded task can neither
//! change the status nor deliver another frame.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::foundation::{ConnectionId, ConnectionStatus, StateMachine};
use crate::ports::{FrameListener, TransportChannel, TransportConnector, TransportError};

/// Default bound on the transport handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Manages the single transport of one telemetry connection.
pub struct ConnectionManager {
    connector: Arc<dyn TransportConnector>,
    listener: Arc<dyn FrameListener>,
    connect_timeout: Duration,
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    status: watch::Sender<ConnectionStatus>,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    url: Option<String>,
    active: Option<ActiveTransport>,
}

struct ActiveTransport {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a validated status change. Caller holds the inner lock.
    fn set_status(&self, to: ConnectionStatus) -> bool {
        self.status.send_if_modified(|current| {
            if current.can_transition_to(&to) {
                *current = to;
                true
            } else {
                false
            }
        })
    }

    /// Changes status on behalf of a transport task, if it is still current.
    fn transition(&self, generation: u64, to: ConnectionStatus) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        if !to.is_live() {
            inner.active = None;
        }
        self.set_status(to)
    }

    /// Runs `f` only while `generation` is the current transport.
    fn with_current(&self, generation: u64, f: impl FnOnce()) -> bool {
        let inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        f();
        true
    }
}

impl ConnectionManager {
    /// Creates a manager that reports inbound traffic to `listener`.
    pub fn new(connector: Arc<dyn TransportConnector>, listener: Arc<dyn FrameListener>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            connector,
            listener,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                status,
            }),
        }
    }

    /// Sets the handshake timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Points the connection at `url`, tearing down any existing transport.
    ///
    /// `None` tears down without reconnecting. The handshake runs on the
    /// ambient Tokio runtime; this call never waits for it.
    pub fn connect(&self, url: Option<String>) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        self.teardown(&mut inner);
        inner.url = url.clone();

        let Some(url) = url else {
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "No async runtime to run the transport on");
                self.shared.set_status(ConnectionStatus::Connecting);
                self.shared.set_status(ConnectionStatus::Errored);
                return;
            }
        };

        let id = ConnectionId::new();
        let generation = inner.generation;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        self.shared.set_status(ConnectionStatus::Connecting);
        tracing::debug!(connection_id = %id, url = %url, "Connecting");

        let task = runtime.spawn(run_transport(TransportTask {
            shared: self.shared.clone(),
            connector: self.connector.clone(),
            listener: self.listener.clone(),
            url,
            id,
            generation,
            connect_timeout: self.connect_timeout,
            outbound: outbound_rx,
        }));

        inner.active = Some(ActiveTransport {
            id,
            outbound,
            task: Some(task),
        });
    }

    /// Tears down the transport. Safe to call repeatedly.
    pub fn close(&self) {
        self.connect(None);
    }

    /// Closes the transport after writing every frame already sent.
    ///
    /// Status becomes `Closed` immediately, exactly as with [`Self::close`].
    /// An open transport is given `connect_timeout` to drain before it is
    /// aborted; a handshake still in flight is aborted at once.
    pub async fn shutdown(&self) {
        let task = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.url = None;
            let was_open = self.status() == ConnectionStatus::Open;
            let task = inner.active.take().and_then(|mut active| {
                tracing::debug!(connection_id = %active.id, was_open, "Draining transport");
                active.task.take()
            });
            if self.status().is_live() {
                self.shared.set_status(ConnectionStatus::Closed);
            }
            task.map(|task| (task, was_open))
        };

        let Some((mut task, was_open)) = task else {
            return;
        };
        if !was_open {
            task.abort();
            return;
        }
        if tokio::time::timeout(self.connect_timeout, &mut task).await.is_err() {
            tracing::warn!("Transport did not drain in time, aborting");
            task.abort();
        }
    }

    /// Serializes `message` and hands it to the open transport.
    ///
    /// Returns false without queueing anything unless the status is `Open`.
    pub fn send<T: Serialize>(&self, message: &T) -> bool {
        let inner = self.shared.lock();
        let status = *self.shared.status.borrow();

        let active = match (&inner.active, status) {
            (Some(active), ConnectionStatus::Open) => active,
            _ => {
                tracing::debug!(status = %status, "Dropping outbound frame, connection not open");
                return false;
            }
        };

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(connection_id = %active.id, error = %e, "Failed to serialize outbound frame");
                return false;
            }
        };

        active.outbound.send(text).is_ok()
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    /// Subscribes to status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// Waits until the current handshake, if any, has finished.
    ///
    /// Returns the status it settled on.
    pub async fn settled(&self) -> ConnectionStatus {
        let mut rx = self.subscribe_status();
        let settled = rx
            .wait_for(|status| *status != ConnectionStatus::Connecting)
            .await
            .map(|status| *status);
        settled.unwrap_or(ConnectionStatus::Closed)
    }

    /// URL of the current connection, if one was requested.
    pub fn url(&self) -> Option<String> {
        self.shared.lock().url.clone()
    }

    /// Identifier of the live transport, if any.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.shared.lock().active.as_ref().map(|active| active.id)
    }

    fn teardown(&self, inner: &mut Inner) {
        if let Some(mut active) = inner.active.take() {
            if let Some(task) = active.task.take() {
                task.abort();
            }
            tracing::debug!(connection_id = %active.id, "Transport torn down");
        }
        if self.status().is_live() {
            self.shared.set_status(ConnectionStatus::Closed);
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        if let Some(task) = inner.active.take().and_then(|mut active| active.task.take()) {
            task.abort();
        }
    }
}

struct TransportTask {
    shared: Arc<Shared>,
    connector: Arc<dyn TransportConnector>,
    listener: Arc<dyn FrameListener>,
    url: String,
    id: ConnectionId,
    generation: u64,
    connect_timeout: Duration,
    outbound: mpsc::UnboundedReceiver<String>,
}

async fn run_transport(mut task: TransportTask) {
    let channel = match tokio::time::timeout(task.connect_timeout, task.connector.connect(&task.url)).await {
        Ok(Ok(channel)) => channel,
        Ok(Err(e)) => return fail(&task, e),
        Err(_) => return fail(&task, TransportError::Timeout(task.connect_timeout)),
    };

    let listener = task.listener.clone();
    let opened = task.shared.with_current(task.generation, || {
        listener.on_open();
    });
    if !opened || !task.shared.transition(task.generation, ConnectionStatus::Open) {
        return;
    }
    tracing::info!(connection_id = %task.id, url = %task.url, "Connection open");

    let TransportChannel { mut sink, mut stream } = channel;

    let end = loop {
        tokio::select! {
            outbound = task.outbound.recv() => match outbound {
                Some(frame) => {
                    if let Err(e) = sink.send(frame).await {
                        break Err(e);
                    }
                }
                None => {
                    // Graceful shutdown: everything queued has been written.
                    if let Err(e) = sink.close().await {
                        tracing::debug!(connection_id = %task.id, error = %e, "Close after shutdown failed");
                    }
                    tracing::debug!(connection_id = %task.id, "Transport drained and closed");
                    return;
                }
            },
            item = stream.next() => match item {
                Some(Ok(frame)) => {
                    // Frames arriving after teardown are dropped.
                    task.shared.with_current(task.generation, || {
                        listener.on_frame(&frame);
                    });
                }
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            }
        }
    };

    match end {
        Ok(()) => {
            tracing::info!(connection_id = %task.id, "Connection closed by server");
            task.shared.transition(task.generation, ConnectionStatus::Closed);
        }
        Err(e) => fail(&task, e),
    }
}

fn fail(task: &TransportTask, error: TransportError) {
    tracing::warn!(
        connection_id = %task.id,
        url = %task.url,
        error = %error,
        "Connection failed"
    );
    task.shared.transition(task.generation, ConnectionStatus::Errored);
}
