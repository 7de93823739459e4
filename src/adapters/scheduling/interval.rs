//! IntervalFrameScheduler - fixed-rate frame clock for headless consumers.
//!
//! Frames fall on multiples of `interval` measured from a fixed origin, so
//! every task scheduled within the same frame window runs at the same
//! boundary, the way a display refresh would.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 16ms | Frame period, clamped to at least 1ms |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::ports::{FrameHandle, FrameScheduler, FrameTask};

/// Default frame period (roughly 60 frames per second).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Runs deferred tasks on a Tokio timer at fixed frame boundaries.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone)]
pub struct IntervalFrameScheduler {
    interval: Duration,
    origin: Instant,
}

impl IntervalFrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_FRAME_INTERVAL),
            origin: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// First frame boundary strictly after `now`.
    fn next_boundary(&self, now: Instant) -> Instant {
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        let period = self.interval.as_nanos().max(1);
        let frames = elapsed / period + 1;
        let offset = u64::try_from(period * frames).unwrap_or(u64::MAX);
        self.origin + Duration::from_nanos(offset)
    }
}

impl Default for IntervalFrameScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl FrameScheduler for IntervalFrameScheduler {
    fn schedule(&self, task: FrameTask) -> FrameHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let deadline = self.next_boundary(Instant::now());

        let flag = cancelled.clone();
        let join = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            if !flag.load(Ordering::SeqCst) {
                task();
            }
        });

        FrameHandle::new(cancelled).with_abort(join.abort_handle())
    }
}
