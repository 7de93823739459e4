//! Integration tests for the telemetry feed behavior.
//!
//! These tests drive complete feeds end to end:
//! 1. A scripted server pushes frames over the in-memory transport
//! 2. The coalescer buffers them with staleness rejection
//! 3. A manual frame scheduler decides exactly when flushes happen
//! 4. Consumers observe deliveries through local state or the registry
//!
//! Uses in-memory implementations to test without a network.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rl_telemetry::adapters::scheduling::ManualFrameScheduler;
use rl_telemetry::adapters::websocket::{InMemoryConnector, ServerEnd};
use rl_telemetry::application::{
    ConsumptionMode, DispatchOutcome, DispatchRegistry, MessageCoalescer, TelemetryFeed,
};
use rl_telemetry::domain::foundation::ConnectionStatus;
use rl_telemetry::domain::telemetry::{TelemetryMessage, WireFrame};
use rl_telemetry::ports::{FnHandler, MessageSink};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    feed: TelemetryFeed,
    connector: Arc<InMemoryConnector>,
    scheduler: Arc<ManualFrameScheduler>,
}

impl Harness {
    fn new(mode: ConsumptionMode) -> Self {
        Self::with_connector(InMemoryConnector::new(), mode)
    }

    fn with_connector(connector: InMemoryConnector, mode: ConsumptionMode) -> Self {
        let connector = Arc::new(connector);
        let scheduler = Arc::new(ManualFrameScheduler::new());
        let feed = TelemetryFeed::new(connector.clone(), scheduler.clone(), mode);
        Self {
            feed,
            connector,
            scheduler,
        }
    }

    fn local() -> Self {
        Self::new(ConsumptionMode::local())
    }

    async fn open(&self, url: &str) -> ServerEnd {
        self.feed.set_url(Some(url.to_string()));
        let server = self.connector.accept().await.expect("connector dropped");
        assert_eq!(self.feed.settled().await, ConnectionStatus::Open);
        server
    }

    /// Waits until the feed has seen `count` frames in total.
    async fn received(&self, count: u64) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.feed.stats().received < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("frames did not arrive");
    }

    fn latest(&self) -> Option<TelemetryMessage> {
        self.feed.local_state().and_then(|state| state.latest())
    }
}

#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<TelemetryMessage>>,
}

impl MessageSink for RecordingSink {
    fn deliver(&self, message: TelemetryMessage) {
        self.delivered.lock().unwrap().push(message);
    }
}

// =============================================================================
// Staleness and coalescing
// =============================================================================

#[tokio::test]
async fn equal_seq_never_replaces_buffered_message() {
    let harness = Harness::local();
    let server = harness.open("mem://ws").await;

    server.push_json(&json!({"seq": 1, "state": [1, 2]}));
    server.push_json(&json!({"seq": 1, "state": [3, 4]}));
    harness.received(2).await;
    harness.scheduler.run_frame();

    let latest = harness.latest().unwrap();
    assert_eq!(latest.data, json!([1, 2]));
    assert_eq!(harness.feed.stats().stale, 1);

    // Nothing else is ever flushed.
    assert_eq!(harness.scheduler.run_frame(), 0);
    assert_eq!(harness.feed.stats().delivered, 1);
}

#[tokio::test]
async fn lower_seq_is_dropped_after_higher() {
    let harness = Harness::local();
    let server = harness.open("mem://ws").await;

    server.push_json(&json!({"seq": 5, "state": "five"}));
    server.push_json(&json!({"seq": 3, "state": "three"}));
    harness.received(2).await;
    harness.scheduler.run_frame();

    let latest = harness.latest().unwrap();
    assert_eq!(latest.seq, Some(5));
    assert_eq!(latest.data, json!("five"));
}

#[tokio::test]
async fn burst_produces_one_flush_per_frame() {
    let harness = Harness::local();
    let server = harness.open("mem://ws").await;

    for seq in 1..=50 {
        server.push_json(&json!({"seq": seq, "state": seq}));
    }
    harness.received(50).await;

    assert_eq!(harness.scheduler.pending(), 1);
    assert_eq!(harness.scheduler.run_frame(), 1);

    let stats = harness.feed.stats();
    assert_eq!(stats.flushes, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(harness.latest().unwrap().seq, Some(50));
}

#[tokio::test]
async fn intermediate_states_are_never_observed() {
    let harness = Harness::local();
    let mut observed = harness.feed.local_state().unwrap().subscribe();
    let server = harness.open("mem://ws").await;

    server.push_json(&json!({"state": "a"}));
    server.push_json(&json!({"state": "b"}));
    server.push_json(&json!({"state": "c"}));
    harness.received(3).await;

    assert!(!observed.has_changed().unwrap());
    harness.scheduler.run_frame();

    assert!(observed.has_changed().unwrap());
    let seen = observed.borrow_and_update().clone().unwrap();
    assert_eq!(seen.data, json!("c"));
}

#[tokio::test]
async fn malformed_frames_leave_buffer_and_status_alone() {
    let harness = Harness::local();
    let server = harness.open("mem://ws").await;

    server.push_json(&json!({"seq": 2, "state": "good"}));
    server.push("{truncated");
    server.push("42");
    harness.received(3).await;
    harness.scheduler.run_frame();

    assert_eq!(harness.latest().unwrap().data, json!("good"));
    assert_eq!(harness.feed.stats().malformed, 2);
    assert_eq!(harness.feed.status(), ConnectionStatus::Open);
}

#[tokio::test]
async fn reconnect_starts_a_fresh_sequence() {
    let harness = Harness::local();
    let first = harness.open("mem://ws?game=snake").await;

    first.push_json(&json!({"seq": 900, "state": "old"}));
    harness.received(1).await;
    harness.scheduler.run_frame();

    let second = harness.open("mem://ws?game=pong").await;
    second.push_json(&json!({"seq": 1, "state": "new"}));
    harness.received(2).await;
    harness.scheduler.run_frame();

    assert_eq!(harness.latest().unwrap().data, json!("new"));
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn shared_feed_routes_typed_messages_without_fallback() {
    let registry = Arc::new(DispatchRegistry::new());
    let config_seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let state_seen = Arc::new(Mutex::new(Vec::<Value>::new()));

    let sink = config_seen.clone();
    registry.register(
        "config",
        Arc::new(FnHandler::new("config", move |data: &Value| {
            sink.lock().unwrap().push(data.clone());
        })),
    );
    let sink = state_seen.clone();
    registry.register_state_handler(Arc::new(FnHandler::new("state", move |data: &Value| {
        sink.lock().unwrap().push(data.clone());
    })));

    let harness = Harness::new(ConsumptionMode::shared(registry.clone()));
    let server = harness.open("mem://ws").await;

    server.push_json(&json!({"type": "config", "data": {"paused": true}}));
    harness.received(1).await;
    harness.scheduler.run_frame();

    assert_eq!(*config_seen.lock().unwrap(), vec![json!({"paused": true})]);
    assert!(state_seen.lock().unwrap().is_empty());
}

#[test]
fn shorthand_and_typed_state_dispatch_identically() {
    let registry = DispatchRegistry::new();
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let sink = seen.clone();
    registry.register_state_handler(Arc::new(FnHandler::new("state", move |data: &Value| {
        sink.lock().unwrap().push(data.clone());
    })));

    let shorthand = registry.dispatch_frame(WireFrame::parse(r#"{"state":{"x":1}}"#).unwrap());
    let typed =
        registry.dispatch_frame(WireFrame::parse(r#"{"type":"state","data":{"x":1}}"#).unwrap());

    assert_eq!(shorthand, DispatchOutcome::StateFallback);
    assert_eq!(typed, DispatchOutcome::StateFallback);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], seen[1]);
}

#[tokio::test]
async fn two_consumers_share_one_connection() {
    let registry = Arc::new(DispatchRegistry::new());
    let board = Arc::new(Mutex::new(None::<Value>));
    let metrics = Arc::new(Mutex::new(None::<Value>));

    let sink = board.clone();
    registry.register_state_handler(Arc::new(FnHandler::new("board", move |data: &Value| {
        *sink.lock().unwrap() = Some(data.clone());
    })));
    let sink = metrics.clone();
    registry.register(
        "metrics",
        Arc::new(FnHandler::new("metrics", move |data: &Value| {
            *sink.lock().unwrap() = Some(data.clone());
        })),
    );

    let harness = Harness::new(ConsumptionMode::shared(registry.clone()));
    let server = harness.open("mem://ws").await;

    server.push_json(&json!({"state": [0, 1]}));
    harness.received(1).await;
    harness.scheduler.run_frame();
    server.push_json(&json!({"type": "metrics", "data": {"reward": 1.5}}));
    harness.received(2).await;
    harness.scheduler.run_frame();

    assert_eq!(*board.lock().unwrap(), Some(json!([0, 1])));
    assert_eq!(*metrics.lock().unwrap(), Some(json!({"reward": 1.5})));
    assert_eq!(harness.connector.attempts().len(), 1);
}

// =============================================================================
// Control
// =============================================================================

#[tokio::test]
async fn pause_while_connecting_is_local_only() {
    let harness = Harness::with_connector(InMemoryConnector::gated(), ConsumptionMode::local());
    let control = harness.feed.control();

    harness.feed.set_url(Some("mem://ws".into()));
    assert_eq!(harness.feed.status(), ConnectionStatus::Connecting);

    assert!(!control.pause());
    assert!(control.is_paused());

    harness.connector.release_handshake();
    let mut server = harness.connector.accept().await.unwrap();
    assert_eq!(harness.feed.settled().await, ConnectionStatus::Open);

    // A frame sent now proves nothing was queued before it.
    assert!(control.send_action("ping", None));
    assert_eq!(server.next_sent().await.unwrap(), r#"{"action":"ping"}"#);
    assert!(server.try_next_sent().is_none());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn close_is_idempotent() {
    let harness = Harness::local();
    let _server = harness.open("mem://ws").await;

    harness.feed.close();
    harness.feed.close();

    assert_eq!(harness.feed.status(), ConnectionStatus::Closed);
}

#[tokio::test]
async fn server_close_ends_in_closed() {
    let harness = Harness::local();
    let server = harness.open("mem://ws").await;

    server.close();

    let mut status = harness.feed.subscribe_status();
    status
        .wait_for(|s| *s == ConnectionStatus::Closed)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_handshake_ends_in_errored_without_retry() {
    let connector = InMemoryConnector::new();
    connector.set_refuse(true);
    let harness = Harness::with_connector(connector, ConsumptionMode::local());

    harness.feed.set_url(Some("mem://ws".into()));
    assert_eq!(harness.feed.settled().await, ConnectionStatus::Errored);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(harness.connector.attempts().len(), 1);
    assert_eq!(harness.feed.status(), ConnectionStatus::Errored);
}

#[tokio::test]
async fn send_is_noop_after_close() {
    let harness = Harness::local();
    let _server = harness.open("mem://ws").await;

    harness.feed.close();

    assert!(!harness.feed.control().send_action("start_inference", None));
}

#[tokio::test]
async fn detach_prevents_dangling_flush() {
    let harness = Harness::local();
    let server = harness.open("mem://ws").await;

    server.push_json(&json!({"seq": 1, "state": "late"}));
    harness.received(1).await;
    harness.feed.detach();

    assert_eq!(harness.scheduler.run_frame(), 0);
    assert!(harness.latest().is_none());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Across any arrival pattern, deliveries happen at most once per frame
    /// and their sequence numbers never go backwards.
    #[test]
    fn delivered_seqs_are_monotonic(
        frames in prop::collection::vec(prop::collection::vec(prop::option::of(0u64..40), 0..6), 1..12)
    ) {
        let scheduler = Arc::new(ManualFrameScheduler::new());
        let sink = Arc::new(RecordingSink::default());
        let coalescer = MessageCoalescer::new(scheduler.clone(), sink.clone());

        for arrivals in &frames {
            for seq in arrivals {
                let frame = match seq {
                    Some(seq) => json!({"seq": seq, "state": seq}),
                    None => json!({"state": null}),
                };
                coalescer.ingest(&frame.to_string());
            }
            prop_assert!(scheduler.run_frame() <= 1);
        }

        let delivered = sink.delivered.lock().unwrap();
        prop_assert!(delivered.len() <= frames.len());
        let seqs: Vec<u64> = delivered.iter().filter_map(|m| m.seq).collect();
        prop_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    /// The newest unsequenced message always wins its frame.
    #[test]
    fn last_unsequenced_message_wins(values in prop::collection::vec(any::<i32>(), 1..20)) {
        let scheduler = Arc::new(ManualFrameScheduler::new());
        let sink = Arc::new(RecordingSink::default());
        let coalescer = MessageCoalescer::new(scheduler.clone(), sink.clone());

        coalescer.ingest(&json!({"seq": 1000, "state": "sequenced"}).to_string());
        for value in &values {
            coalescer.ingest(&json!({"state": value}).to_string());
        }
        scheduler.run_frame();

        let delivered = sink.delivered.lock().unwrap();
        prop_assert_eq!(delivered.len(), 1);
        prop_assert_eq!(&delivered[0].data, &json!(values[values.len() - 1]));
    }
}
