//! DashboardSession - composition root for one dashboard.
//!
//! Owns the shared [`DispatchRegistry`], an inference feed that dispatches
//! through it, and a training feed consumed locally. Inference and the
//! training view are mutually exclusive: at most one feed is active.
//!
//! The session installs the registry's state handler to track what the
//! inference view displays. Consumers that need the raw state stream
//! should subscribe with [`DashboardSession::subscribe_inference_state`]
//! rather than replace that handler.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::application::{
    ConsumptionMode, DispatchRegistry, TelemetryFeed, TelemetryFeedOptions,
};
use crate::domain::foundation::{ConnectionStatus, Game, ValidationError};
use crate::domain::telemetry::{FeedEndpoint, FeedKind, InferenceAction};
use crate::ports::{FnHandler, FrameScheduler, TransportConnector};

/// Which feed the dashboard is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Idle,
    Training,
    Inferencing,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionMode::Idle => "idle",
            SessionMode::Training => "training",
            SessionMode::Inferencing => "inference",
        };
        write!(f, "{}", s)
    }
}

/// Errors from session commands.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot start inference while training is running")]
    TrainingActive,

    #[error("Cannot watch training while inference is running")]
    InferenceActive,

    #[error("Inference is not running")]
    NotInferencing,

    #[error("Inference feed did not open (status: {0})")]
    NotConnected(ConnectionStatus),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Settings a session is built from.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Backend `host[:port]`.
    pub host: String,
    /// Game selected at startup.
    pub game: Game,
    pub feed: TelemetryFeedOptions,
}

impl SessionSettings {
    pub fn new(host: impl Into<String>, game: Game) -> Self {
        Self {
            host: host.into(),
            game,
            feed: TelemetryFeedOptions::default(),
        }
    }

    pub fn with_feed_options(mut self, feed: TelemetryFeedOptions) -> Self {
        self.feed = feed;
        self
    }
}

struct Selection {
    mode: SessionMode,
    game: Game,
}

/// One dashboard: a shared inference feed and a local training feed.
pub struct DashboardSession {
    host: String,
    registry: Arc<DispatchRegistry>,
    inference: TelemetryFeed,
    training: TelemetryFeed,
    inference_state: Arc<watch::Sender<Option<Value>>>,
    selection: Mutex<Selection>,
}

impl DashboardSession {
    pub fn new(
        settings: SessionSettings,
        connector: Arc<dyn TransportConnector>,
        scheduler: Arc<dyn FrameScheduler>,
    ) -> Result<Self, SessionError> {
        // Reject a bad host up front rather than on first connect.
        FeedEndpoint::new(settings.host.clone(), FeedKind::Inference)?;

        let registry = Arc::new(DispatchRegistry::new());
        let (inference_state, _) = watch::channel(None);
        let inference_state = Arc::new(inference_state);

        let displayed = inference_state.clone();
        registry.register_state_handler(Arc::new(FnHandler::new(
            "dashboard_state",
            move |data: &Value| {
                // Empty frames keep the last board on screen.
                if !is_blank(data) {
                    displayed.send_replace(Some(data.clone()));
                }
            },
        )));

        let inference = TelemetryFeed::with_options(
            connector.clone(),
            scheduler.clone(),
            ConsumptionMode::shared(registry.clone()),
            settings.feed.clone(),
        );
        let training = TelemetryFeed::with_options(
            connector,
            scheduler,
            ConsumptionMode::local(),
            settings.feed,
        );

        Ok(Self {
            host: settings.host,
            registry,
            inference,
            training,
            inference_state,
            selection: Mutex::new(Selection {
                mode: SessionMode::Idle,
                game: settings.game,
            }),
        })
    }

    fn selection(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, kind: FeedKind, game: Game) -> Result<FeedEndpoint, SessionError> {
        Ok(FeedEndpoint::new(self.host.clone(), kind)?.with_game(game))
    }

    pub fn mode(&self) -> SessionMode {
        self.selection().mode
    }

    pub fn game(&self) -> Game {
        self.selection().game
    }

    /// Registry shared by every consumer of the inference feed.
    pub fn registry(&self) -> &Arc<DispatchRegistry> {
        &self.registry
    }

    pub fn inference_feed(&self) -> &TelemetryFeed {
        &self.inference
    }

    pub fn training_feed(&self) -> &TelemetryFeed {
        &self.training
    }

    /// Opens the inference feed for the selected game and starts inference.
    ///
    /// The session counts as inferencing from the moment the feed starts
    /// connecting, so the training view stays locked out during the
    /// handshake. A failed handshake returns the session to idle.
    pub async fn start_inference(&self) -> Result<(), SessionError> {
        let game = {
            let mut selection = self.selection();
            if selection.mode == SessionMode::Training {
                tracing::warn!("Cannot infer while training is running");
                return Err(SessionError::TrainingActive);
            }
            let endpoint = self.endpoint(FeedKind::Inference, selection.game)?;
            tracing::info!(game = %selection.game, url = %endpoint, "Starting inference");
            selection.mode = SessionMode::Inferencing;
            self.inference.set_url(Some(endpoint.url()));
            selection.game
        };

        let status = self.inference.settled().await;
        if status != ConnectionStatus::Open {
            let mut selection = self.selection();
            if selection.mode == SessionMode::Inferencing {
                selection.mode = SessionMode::Idle;
            }
            return Err(SessionError::NotConnected(status));
        }

        self.inference
            .control()
            .send_inference(InferenceAction::Start, game);
        Ok(())
    }

    /// Asks the backend to pause inference. Returns whether the frame was sent.
    pub fn pause_inference(&self) -> Result<bool, SessionError> {
        let game = {
            let selection = self.selection();
            if selection.mode != SessionMode::Inferencing {
                return Err(SessionError::NotInferencing);
            }
            selection.game
        };

        Ok(self
            .inference
            .control()
            .send_inference(InferenceAction::Pause, game))
    }

    /// Sends `stop_inference`, then closes the inference feed.
    ///
    /// Returns whether the stop frame was sent. Does nothing unless
    /// inference is running.
    pub async fn stop_inference(&self) -> bool {
        let game = {
            let mut selection = self.selection();
            if selection.mode != SessionMode::Inferencing {
                return false;
            }
            selection.mode = SessionMode::Idle;
            selection.game
        };

        let sent = self
            .inference
            .control()
            .send_inference(InferenceAction::Stop, game);
        self.inference.shutdown().await;
        tracing::info!(game = %game, sent, "Inference stopped");
        sent
    }

    /// Opens the training feed for the selected game.
    pub fn watch_training(&self) -> Result<(), SessionError> {
        let game = {
            let mut selection = self.selection();
            if selection.mode == SessionMode::Inferencing {
                tracing::warn!("Cannot train while inference is running");
                return Err(SessionError::InferenceActive);
            }
            selection.mode = SessionMode::Training;
            selection.game
        };

        let endpoint = self.endpoint(FeedKind::Training, game)?;
        tracing::info!(game = %game, url = %endpoint, "Watching training");
        self.training.set_url(Some(endpoint.url()));
        Ok(())
    }

    /// Closes the training feed.
    pub fn stop_watching_training(&self) {
        let mut selection = self.selection();
        if selection.mode == SessionMode::Training {
            selection.mode = SessionMode::Idle;
        }
        drop(selection);
        self.training.detach();
    }

    /// Switches game. Running inference stops; a training view follows.
    pub async fn select_game(&self, game: Game) -> Result<(), SessionError> {
        if self.game() == game {
            return Ok(());
        }

        if self.mode() == SessionMode::Inferencing {
            tracing::info!(game = %game, "Game changed, stopping inference");
            self.stop_inference().await;
        }

        let mode = {
            let mut selection = self.selection();
            selection.game = game;
            selection.mode
        };

        if mode == SessionMode::Training {
            let endpoint = self.endpoint(FeedKind::Training, game)?;
            self.training.set_url(Some(endpoint.url()));
        }
        Ok(())
    }

    /// State the dashboard shows right now.
    ///
    /// The training view shows its own feed; otherwise the last non-empty
    /// inference state is shown, even after inference stopped.
    pub fn displayed_state(&self) -> Option<Value> {
        match self.mode() {
            SessionMode::Training => self
                .training
                .local_state()
                .and_then(|state| state.latest())
                .map(|message| message.data),
            _ => self.inference_state.borrow().clone(),
        }
    }

    /// Subscribes to the inference state shown by the dashboard.
    pub fn subscribe_inference_state(&self) -> watch::Receiver<Option<Value>> {
        self.inference_state.subscribe()
    }

    /// Closes both feeds and returns to idle.
    pub fn detach(&self) {
        self.selection().mode = SessionMode::Idle;
        self.inference.detach();
        self.training.detach();
    }
}

fn is_blank(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
