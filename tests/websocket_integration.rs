//! End-to-end tests of the real WebSocket connector against an axum server.
//!
//! The server mimics the RL backend's telemetry endpoint:
//! - `GET /ws?game=<id>` streams a scripted burst of state frames
//! - Every client frame is forwarded to the test for assertions
//! - `{"action":"stop_inference"}` makes the server close the socket

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

use rl_telemetry::adapters::scheduling::IntervalFrameScheduler;
use rl_telemetry::adapters::websocket::TungsteniteConnector;
use rl_telemetry::application::{
    ConsumptionMode, DashboardSession, SessionSettings, TelemetryFeed,
};
use rl_telemetry::domain::foundation::{ConnectionStatus, Game};
use rl_telemetry::domain::telemetry::TelemetryMessage;

const TIMEOUT: Duration = Duration::from_secs(5);

// ════════════════════════════════════════════════════════════════════════════════
// Test Server
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
struct ServerState {
    received: mpsc::UnboundedSender<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<ServerState>,
) -> Response {
    let game = params.get("game").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, game, state))
}

async fn handle_socket(socket: WebSocket, game: String, state: ServerState) {
    let (mut sender, mut receiver) = socket.split();

    let script = vec![
        Message::Text(json!({"type": "hello", "data": {"game": game}}).to_string()),
        Message::Text(json!({"seq": 1, "state": [1]}).to_string()),
        Message::Ping(vec![7]),
        Message::Text(json!({"seq": 3, "state": [3]}).to_string()),
        Message::Text("not json".to_string()),
        Message::Text(json!({"seq": 2, "state": [2]}).to_string()),
        Message::Binary(json!({"seq": 4, "state": [4]}).to_string().into_bytes()),
    ];
    for message in script {
        if sender.send(message).await.is_err() {
            return;
        }
    }

    while let Some(Ok(message)) = receiver.next().await {
        if let Message::Text(text) = message {
            let stop = text.contains("stop_inference");
            let _ = state.received.send(text);
            if stop {
                let _ = sender.send(Message::Close(None)).await;
                return;
            }
        }
    }
}

/// Boot a test server and return its address plus the client-frame log.
async fn boot_server() -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let (received, log) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(ServerState { received });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

fn local_feed() -> TelemetryFeed {
    TelemetryFeed::new(
        Arc::new(TungsteniteConnector::new()),
        Arc::new(IntervalFrameScheduler::new(Duration::from_millis(5))),
        ConsumptionMode::local(),
    )
}

async fn wait_for_message(
    feed: &TelemetryFeed,
    predicate: impl Fn(&TelemetryMessage) -> bool,
) -> TelemetryMessage {
    let mut rx = feed.local_state().unwrap().subscribe();
    let found = timeout(
        TIMEOUT,
        rx.wait_for(|latest| latest.as_ref().is_some_and(|m| predicate(m))),
    )
    .await
    .expect("message not delivered in time")
    .unwrap();
    found.clone().unwrap()
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn feed_receives_latest_state_over_websocket() {
    let (addr, _log) = boot_server().await;
    let feed = local_feed();

    feed.set_url(Some(format!("ws://{addr}/ws?game=snake")));
    assert_eq!(feed.settled().await, ConnectionStatus::Open);

    let latest = wait_for_message(&feed, |m| m.seq == Some(4)).await;
    assert_eq!(latest.data, json!([4]));

    let stats = feed.stats();
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.stale, 1);
    assert!(stats.delivered >= 1);
    assert!(stats.delivered <= stats.flushes);
}

#[tokio::test]
async fn control_frames_reach_server() {
    let (addr, mut log) = boot_server().await;
    let feed = local_feed();

    feed.set_url(Some(format!("ws://{addr}/ws")));
    assert_eq!(feed.settled().await, ConnectionStatus::Open);

    let control = feed.control();
    assert!(control.pause());
    assert!(control.resume());

    let first: Value = serde_json::from_str(&timeout(TIMEOUT, log.recv()).await.unwrap().unwrap()).unwrap();
    let second: Value = serde_json::from_str(&timeout(TIMEOUT, log.recv()).await.unwrap().unwrap()).unwrap();
    assert_eq!(first, json!({"type": "config", "value": {"paused": true}}));
    assert_eq!(second, json!({"type": "config", "value": {"paused": false}}));
}

#[tokio::test]
async fn unreachable_backend_ends_errored() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let feed = local_feed();
    feed.set_url(Some(format!("ws://{addr}/ws")));

    assert_eq!(feed.settled().await, ConnectionStatus::Errored);
}

#[tokio::test]
async fn inference_session_round_trip() {
    let (addr, mut log) = boot_server().await;
    let session = DashboardSession::new(
        SessionSettings::new(addr.to_string(), Game::Pong),
        Arc::new(TungsteniteConnector::new()),
        Arc::new(IntervalFrameScheduler::new(Duration::from_millis(5))),
    )
    .unwrap();

    session.start_inference().await.unwrap();
    let start: Value = serde_json::from_str(&timeout(TIMEOUT, log.recv()).await.unwrap().unwrap()).unwrap();
    assert_eq!(start, json!({"action": "start_inference", "game": "pong"}));

    let mut states = session.subscribe_inference_state();
    timeout(TIMEOUT, states.wait_for(|s| s.as_ref() == Some(&json!([4]))))
        .await
        .expect("state not displayed in time")
        .unwrap();

    assert!(session.stop_inference().await);
    let stop: Value = serde_json::from_str(&timeout(TIMEOUT, log.recv()).await.unwrap().unwrap()).unwrap();
    assert_eq!(stop, json!({"action": "stop_inference", "game": "pong"}));
    assert_eq!(session.inference_feed().status(), ConnectionStatus::Closed);
    assert_eq!(session.displayed_state(), Some(json!([4])));
}
