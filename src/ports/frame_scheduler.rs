//! FrameScheduler port - the "next rendering opportunity".
//!
//! The coalescer defers delivery to the next frame instead of delivering on
//! every inbound message. What a frame is depends on the host: a display
//! refresh in a UI, a fixed-interval clock in a headless consumer, or an
//! explicit step in a test harness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::AbortHandle;

/// Deferred work run at most once, at the next frame.
pub type FrameTask = Box<dyn FnOnce() + Send + 'static>;

/// Handle to one scheduled task.
///
/// Cancelling marks the task so the scheduler skips it and, for schedulers
/// backed by a Tokio task, aborts that task.
#[derive(Debug)]
pub struct FrameHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl FrameHandle {
    /// Creates a handle sharing `cancelled` with the scheduler.
    pub fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            abort: None,
        }
    }

    /// Attaches the Tokio task running the deferred work.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Prevents the task from running if it has not started yet.
    pub fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Port for single-shot frame scheduling.
///
/// Implementations must run each task at most once and never synchronously
/// inside `schedule`.
pub trait FrameScheduler: Send + Sync {
    /// Arranges for `task` to run at the next frame.
    fn schedule(&self, task: FrameTask) -> FrameHandle;
}
