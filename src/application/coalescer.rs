//! MessageCoalescer - lossy-but-current delivery at frame cadence.
//!
//! Inbound frames are parsed, normalized, and offered to a single-slot
//! [`PendingBuffer`]. The first accepted message after a flush schedules
//! one flush on the [`FrameScheduler`]; later messages in the same frame
//! only replace the buffer. Consumers therefore see at most one message
//! per frame, and always the newest one that passed staleness rejection.
//!
//! Every scheduled flush carries the epoch it was scheduled in. `reset`
//! and `cancel` start a new epoch, so a flush that outlives its consumer
//! finds nothing to do.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;

use crate::domain::telemetry::{Admission, PendingBuffer, TelemetryMessage, WireFrame};
use crate::ports::{FrameHandle, FrameListener, FrameScheduler, MessageSink};

/// Snapshot of a feed's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    /// Frames that reached the coalescer.
    pub received: u64,
    /// Frames that were not a JSON object of the expected shape.
    pub malformed: u64,
    /// Messages dropped by staleness rejection.
    pub stale: u64,
    /// Flushes that ran.
    pub flushes: u64,
    /// Messages handed to the sink.
    pub delivered: u64,
}

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    malformed: AtomicU64,
    stale: AtomicU64,
    flushes: AtomicU64,
    delivered: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FeedStats {
        FeedStats {
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct State {
    pending: PendingBuffer,
    flush_scheduled: bool,
    epoch: u64,
    handle: Option<FrameHandle>,
}

/// Buffers inbound telemetry and releases it once per frame.
pub struct MessageCoalescer {
    this: Weak<MessageCoalescer>,
    state: Mutex<State>,
    scheduler: Arc<dyn FrameScheduler>,
    sink: Arc<dyn MessageSink>,
    counters: Counters,
}

impl MessageCoalescer {
    pub fn new(scheduler: Arc<dyn FrameScheduler>, sink: Arc<dyn MessageSink>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            state: Mutex::new(State::default()),
            scheduler,
            sink,
            counters: Counters::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ingests one raw text frame.
    pub fn ingest(&self, frame: &str) {
        Counters::bump(&self.counters.received);

        match WireFrame::parse(frame) {
            Ok(wire) => self.offer(TelemetryMessage::from(wire)),
            Err(e) => {
                Counters::bump(&self.counters.malformed);
                tracing::warn!(error = %e, len = frame.len(), "Discarding malformed frame");
            }
        }
    }

    /// Offers an already-normalized message.
    pub fn offer(&self, message: TelemetryMessage) {
        let mut state = self.lock();

        if let Admission::Stale { seq, latest } = state.pending.offer(message) {
            Counters::bump(&self.counters.stale);
            tracing::trace!(seq, latest, "Dropping stale message");
            return;
        }

        if state.flush_scheduled {
            return;
        }

        let epoch = state.epoch;
        let this = self.this.clone();
        state.flush_scheduled = true;
        state.handle = Some(self.scheduler.schedule(Box::new(move || {
            if let Some(coalescer) = this.upgrade() {
                coalescer.flush(epoch);
            }
        })));
    }

    /// Delivers the buffered message scheduled in `epoch`.
    fn flush(&self, epoch: u64) {
        let message = {
            let mut state = self.lock();
            if state.epoch != epoch || !state.flush_scheduled {
                return;
            }
            state.flush_scheduled = false;
            state.handle = None;
            state.pending.take()
        };

        Counters::bump(&self.counters.flushes);
        if let Some(message) = message {
            Counters::bump(&self.counters.delivered);
            tracing::trace!(
                seq = ?message.seq,
                kind = message.kind_str(),
                latency_ms = message.age().num_milliseconds(),
                "Delivering coalesced message"
            );
            self.sink.deliver(message);
        }
    }

    /// Cancels any scheduled flush and forgets buffered state.
    pub fn reset(&self) {
        let handle = {
            let mut state = self.lock();
            state.epoch = state.epoch.wrapping_add(1);
            state.flush_scheduled = false;
            state.pending.reset();
            state.handle.take()
        };
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    /// Cancels any scheduled flush. Equivalent to [`Self::reset`].
    pub fn cancel(&self) {
        self.reset();
    }

    /// Returns true while a flush is waiting for the next frame.
    pub fn flush_pending(&self) -> bool {
        self.lock().flush_scheduled
    }

    /// Highest sequence number accepted since the last reset.
    pub fn latest_seq(&self) -> Option<u64> {
        self.lock().pending.latest_seq()
    }

    pub fn stats(&self) -> FeedStats {
        self.counters.snapshot()
    }
}

impl FrameListener for MessageCoalescer {
    fn on_open(&self) {
        self.reset();
    }

    fn on_frame(&self, frame: &str) {
        self.ingest(frame);
    }
}
