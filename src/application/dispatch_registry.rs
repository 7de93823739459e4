//! DispatchRegistry - routes delivered messages to consumers by type tag.
//!
//! Shared-mode feeds deliver into a registry so several independent
//! consumers can observe one connection. The registry is an ordinary value
//! passed around in an `Arc`; whoever composes the consumers owns it.
//!
//! Routing order for a message of kind `k`:
//! 1. The handler registered for `k`
//! 2. The state handler, when `k == "state"`
//! 3. Otherwise the message is unroutable: logged and counted

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::telemetry::{TelemetryMessage, WireFrame};
use crate::ports::{MessageHandler, MessageSink};

/// How a dispatched message was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler registered for the message's kind ran.
    Handled,
    /// The state handler ran for an untargeted state message.
    StateFallback,
    /// No handler applied; the message was dropped.
    Unroutable,
}

/// Handler table keyed by message kind. Last registration wins.
#[derive(Default)]
pub struct DispatchRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
    state_handler: RwLock<Option<Arc<dyn MessageHandler>>>,
    unroutable: AtomicU64,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` for `kind`, returning the handler it replaced.
    ///
    /// Safe to repeat: consumers re-register on every mount.
    pub fn register(
        &self,
        kind: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Option<Arc<dyn MessageHandler>> {
        let kind = kind.into();
        tracing::debug!(kind = %kind, handler = handler.name(), "Registering handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, handler)
    }

    /// Removes the handler for `kind`.
    pub fn unregister(&self, kind: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(kind)
    }

    /// Installs the fallback for `state` messages, returning the previous one.
    pub fn register_state_handler(
        &self,
        handler: Arc<dyn MessageHandler>,
    ) -> Option<Arc<dyn MessageHandler>> {
        tracing::debug!(handler = handler.name(), "Registering state handler");
        self.state_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handler)
    }

    /// Removes the state fallback.
    pub fn clear_state_handler(&self) -> Option<Arc<dyn MessageHandler>> {
        self.state_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Routes a normalized message.
    pub fn dispatch(&self, message: &TelemetryMessage) -> DispatchOutcome {
        // Clone the handler out so it runs without the table locked.
        let handler = message.kind.as_deref().and_then(|kind| {
            self.handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(kind)
                .cloned()
        });

        if let Some(handler) = handler {
            handler.handle(&message.data);
            return DispatchOutcome::Handled;
        }

        if message.is_state() {
            let fallback = self
                .state_handler
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(fallback) = fallback {
                fallback.handle(&message.data);
                return DispatchOutcome::StateFallback;
            }
        }

        self.unroutable.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(kind = message.kind_str(), seq = ?message.seq, "Unroutable message");
        DispatchOutcome::Unroutable
    }

    /// Normalizes a raw frame, then routes it.
    pub fn dispatch_frame(&self, frame: WireFrame) -> DispatchOutcome {
        self.dispatch(&TelemetryMessage::from(frame))
    }

    /// Returns true if a handler is registered for `kind`.
    pub fn has_handler(&self, kind: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(kind)
    }

    pub fn has_state_handler(&self) -> bool {
        self.state_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of messages dropped as unroutable.
    pub fn unroutable_count(&self) -> u64 {
        self.unroutable.load(Ordering::Relaxed)
    }
}

impl MessageSink for DispatchRegistry {
    fn deliver(&self, message: TelemetryMessage) {
        self.dispatch(&message);
    }
}
