//! TelemetryFeed - one connection, one coalescer, one consumption path.
//!
//! The consumption path is chosen when the feed is built and never
//! changes:
//!
//! - [`ConsumptionMode::Local`] delivers into a private [`LocalState`],
//!   isolating one consumer from everything else.
//! - [`ConsumptionMode::Shared`] delivers into a [`DispatchRegistry`] so
//!   several consumers can observe the same feed.
//!
//! Dropping a feed detaches it: the transport is closed and any flush
//! still waiting for the next frame is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::application::{
    ConnectionManager, ControlChannel, DispatchRegistry, FeedStats, MessageCoalescer,
    DEFAULT_CONNECT_TIMEOUT,
};
use crate::domain::foundation::ConnectionStatus;
use crate::domain::telemetry::TelemetryMessage;
use crate::ports::{FrameScheduler, MessageSink, TransportConnector};

/// Latest message of a local-mode feed.
pub struct LocalState {
    latest: watch::Sender<Option<TelemetryMessage>>,
}

impl LocalState {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self { latest }
    }

    /// Most recently delivered message.
    pub fn latest(&self) -> Option<TelemetryMessage> {
        self.latest.borrow().clone()
    }

    /// Subscribes to deliveries.
    pub fn subscribe(&self) -> watch::Receiver<Option<TelemetryMessage>> {
        self.latest.subscribe()
    }

    pub fn clear(&self) {
        self.latest.send_replace(None);
    }
}

impl Default for LocalState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSink for LocalState {
    fn deliver(&self, message: TelemetryMessage) {
        self.latest.send_replace(Some(message));
    }
}

/// Where a feed's flushed messages go.
#[derive(Clone)]
pub enum ConsumptionMode {
    Local(Arc<LocalState>),
    Shared(Arc<DispatchRegistry>),
}

impl ConsumptionMode {
    /// Local mode with a fresh state slot.
    pub fn local() -> Self {
        ConsumptionMode::Local(Arc::new(LocalState::new()))
    }

    pub fn shared(registry: Arc<DispatchRegistry>) -> Self {
        ConsumptionMode::Shared(registry)
    }

    fn sink(&self) -> Arc<dyn MessageSink> {
        match self {
            ConsumptionMode::Local(state) => state.clone(),
            ConsumptionMode::Shared(registry) => registry.clone(),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, ConsumptionMode::Shared(_))
    }
}

/// Options for building a [`TelemetryFeed`].
#[derive(Debug, Clone)]
pub struct TelemetryFeedOptions {
    /// Bound on the transport handshake.
    pub connect_timeout: Duration,
}

impl Default for TelemetryFeedOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl TelemetryFeedOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// A telemetry feed owned by one consumer (local) or a registry (shared).
pub struct TelemetryFeed {
    connection: Arc<ConnectionManager>,
    coalescer: Arc<MessageCoalescer>,
    control: ControlChannel,
    mode: ConsumptionMode,
}

impl TelemetryFeed {
    /// Builds an idle feed with default options.
    pub fn new(
        connector: Arc<dyn TransportConnector>,
        scheduler: Arc<dyn FrameScheduler>,
        mode: ConsumptionMode,
    ) -> Self {
        Self::with_options(connector, scheduler, mode, TelemetryFeedOptions::default())
    }

    pub fn with_options(
        connector: Arc<dyn TransportConnector>,
        scheduler: Arc<dyn FrameScheduler>,
        mode: ConsumptionMode,
        options: TelemetryFeedOptions,
    ) -> Self {
        let coalescer = MessageCoalescer::new(scheduler, mode.sink());
        let connection = Arc::new(
            ConnectionManager::new(connector, coalescer.clone())
                .with_connect_timeout(options.connect_timeout),
        );
        let control = ControlChannel::new(connection.clone());

        Self {
            connection,
            coalescer,
            control,
            mode,
        }
    }

    /// Points the feed at `url`; `None` disconnects.
    ///
    /// Anything buffered from the previous transport is discarded.
    pub fn set_url(&self, url: Option<String>) {
        self.connection.connect(url);
        self.coalescer.reset();
    }

    /// Closes the transport and drops any pending flush. Idempotent.
    pub fn close(&self) {
        self.set_url(None);
    }

    /// Closes the transport once every frame already sent has been written.
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
        self.coalescer.reset();
    }

    /// Closes the transport and cancels any pending flush.
    pub fn detach(&self) {
        self.close();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.subscribe_status()
    }

    /// Waits for the current handshake to finish.
    pub async fn settled(&self) -> ConnectionStatus {
        self.connection.settled().await
    }

    pub fn url(&self) -> Option<String> {
        self.connection.url()
    }

    /// Control channel over this feed's connection.
    pub fn control(&self) -> ControlChannel {
        self.control.clone()
    }

    pub fn stats(&self) -> FeedStats {
        self.coalescer.stats()
    }

    pub fn mode(&self) -> &ConsumptionMode {
        &self.mode
    }

    /// The local state slot, for local-mode feeds.
    pub fn local_state(&self) -> Option<&Arc<LocalState>> {
        match &self.mode {
            ConsumptionMode::Local(state) => Some(state),
            ConsumptionMode::Shared(_) => None,
        }
    }
}

impl Drop for TelemetryFeed {
    fn drop(&mut self) {
        self.detach();
    }
}
