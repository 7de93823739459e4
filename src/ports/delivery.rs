//! Delivery ports - how frames and messages move between components.
//!
//! ```text
//! transport ──FrameListener──▶ coalescer ──MessageSink──▶ local state
//!                                                      └─▶ dispatch registry ──MessageHandler──▶ consumer
//! ```

use serde_json::Value;

use crate::domain::telemetry::TelemetryMessage;

/// Receives raw inbound traffic from a connection.
///
/// Called from the transport task, one call at a time per connection.
pub trait FrameListener: Send + Sync {
    /// A new transport finished its handshake.
    fn on_open(&self);

    /// A text frame arrived.
    fn on_frame(&self, frame: &str);
}

/// Consumption path for flushed messages.
///
/// A feed picks exactly one sink when it is created: local state for an
/// isolated consumer, or a shared dispatch registry.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, message: TelemetryMessage);
}

/// Handler invoked by the dispatch registry with a message's `data`.
///
/// Implementations should be:
/// - **Quick** - Runs on the flush path; heavy work belongs elsewhere
/// - **Idempotent to register** - Consumers re-register on every mount
pub trait MessageHandler: Send + Sync {
    fn handle(&self, data: &Value);

    /// Handler name for logging.
    fn name(&self) -> &'static str {
        "anonymous"
    }
}

/// Adapts a closure into a [`MessageHandler`].
pub struct FnHandler<F> {
    name: &'static str,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Value) + Send + Sync,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&Value) + Send + Sync,
{
    fn handle(&self, data: &Value) {
        (self.f)(data)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn FrameListener, _: &dyn MessageSink, _: &dyn MessageHandler) {}

    #[test]
    fn fn_handler_forwards_data_and_name() {
        let seen = Mutex::new(Vec::new());
        let handler = FnHandler::new("recorder", |data: &Value| {
            seen.lock().unwrap().push(data.clone());
        });

        handler.handle(&json!({"paused": true}));

        assert_eq!(handler.name(), "recorder");
        assert_eq!(*seen.lock().unwrap(), vec![json!({"paused": true})]);
    }
}
