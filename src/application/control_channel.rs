//! ControlChannel - outbound intent over a feed's connection.
//!
//! Pause and resume are optimistic: the local flag flips before anything
//! is sent, and nothing waits for the backend to acknowledge. A send that
//! happens while the connection is not open is lost, so the local flag and
//! the backend can disagree until [`ControlChannel::reconcile`] is called.

use std::sync::Arc;

use tokio::sync::watch;

use crate::application::ConnectionManager;
use crate::domain::foundation::Game;
use crate::domain::telemetry::{ControlMessage, InferenceAction};

/// Handle for sending control frames on one connection.
///
/// Clones share the same paused flag.
#[derive(Clone)]
pub struct ControlChannel {
    connection: Arc<ConnectionManager>,
    paused: Arc<watch::Sender<bool>>,
}

impl ControlChannel {
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            connection,
            paused: Arc::new(paused),
        }
    }

    /// Marks the feed paused and tells the backend.
    ///
    /// Returns whether the frame was sent.
    pub fn pause(&self) -> bool {
        self.set_paused(true)
    }

    /// Marks the feed running and tells the backend.
    pub fn resume(&self) -> bool {
        self.set_paused(false)
    }

    fn set_paused(&self, paused: bool) -> bool {
        self.paused.send_replace(paused);
        let sent = self.connection.send(&ControlMessage::paused(paused));
        if !sent {
            tracing::debug!(paused, "Pause state changed locally only");
        }
        sent
    }

    /// Re-sends the local paused flag so the backend matches it.
    pub fn reconcile(&self) -> bool {
        self.connection.send(&ControlMessage::paused(self.is_paused()))
    }

    /// Sends a fire-and-forget action command.
    pub fn send_action(&self, action: impl Into<String>, game: Option<Game>) -> bool {
        self.connection.send(&ControlMessage::action(action, game))
    }

    /// Sends an inference lifecycle action for `game`.
    pub fn send_inference(&self, action: InferenceAction, game: Game) -> bool {
        self.connection.send(&ControlMessage::inference(action, game))
    }

    /// Local (optimistic) paused flag.
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn subscribe_paused(&self) -> watch::Receiver<bool> {
        self.paused.subscribe()
    }
}
