//! Headless telemetry monitor.
//!
//! Connects to the configured feed, logs every state the dashboard would
//! display, and detaches cleanly on Ctrl-C.

use std::sync::Arc;

use rl_telemetry::adapters::scheduling::IntervalFrameScheduler;
use rl_telemetry::adapters::websocket::TungsteniteConnector;
use rl_telemetry::application::{DashboardSession, TelemetryFeed};
use rl_telemetry::config::{AppConfig, LogFormat, LoggingConfig};
use rl_telemetry::domain::foundation::ConnectionStatus;
use rl_telemetry::domain::telemetry::FeedKind;

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(logging.env_filter());
    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

fn payload_size(data: &serde_json::Value) -> usize {
    serde_json::to_string(data).map(|s| s.len()).unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    let endpoint = config.backend.endpoint()?;
    tracing::info!(url = %endpoint, game = %config.backend.game, "Starting telemetry monitor");

    let session = DashboardSession::new(
        config.session_settings(),
        Arc::new(TungsteniteConnector::new()),
        Arc::new(IntervalFrameScheduler::new(config.feed.frame_interval())),
    )?;

    let feed: &TelemetryFeed = match config.backend.feed {
        FeedKind::Inference => {
            session.start_inference().await?;
            let mut states = session.subscribe_inference_state();
            tokio::spawn(async move {
                while states.changed().await.is_ok() {
                    if let Some(data) = states.borrow_and_update().as_ref() {
                        tracing::info!(kind = "state", bytes = payload_size(data), "Inference state");
                    }
                }
            });
            session.inference_feed()
        }
        FeedKind::Training => {
            session.watch_training()?;
            let feed = session.training_feed();
            if let Some(local) = feed.local_state() {
                let mut messages = local.subscribe();
                tokio::spawn(async move {
                    while messages.changed().await.is_ok() {
                        if let Some(message) = messages.borrow_and_update().as_ref() {
                            tracing::info!(
                                kind = message.kind_str(),
                                seq = ?message.seq,
                                bytes = payload_size(&message.data),
                                age_ms = message.age().num_milliseconds(),
                                "Training state"
                            );
                        }
                    }
                });
            }
            feed
        }
    };

    let mut status = feed.subscribe_status();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            _ = &mut interrupted => {
                tracing::info!("Interrupted, detaching");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                tracing::info!(status = %current, "Feed status changed");
                if matches!(current, ConnectionStatus::Closed | ConnectionStatus::Errored) {
                    break;
                }
            }
        }
    }

    session.stop_inference().await;
    session.detach();

    let stats = feed.stats();
    tracing::info!(
        received = stats.received,
        malformed = stats.malformed,
        stale = stats.stale,
        flushes = stats.flushes,
        delivered = stats.delivered,
        unroutable = session.registry().unroutable_count(),
        "Telemetry monitor stopped"
    );

    Ok(())
}
