//! ManualFrameScheduler - frames advance only when the caller says so.
//!
//! Gives tests exact control over frame boundaries: everything scheduled
//! before [`ManualFrameScheduler::run_frame`] runs in that frame, anything
//! scheduled while the frame runs waits for the next one.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. Nothing runs unless driven.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::ports::{FrameHandle, FrameScheduler, FrameTask};

/// Frame scheduler driven by explicit `run_frame` calls.
#[derive(Default)]
pub struct ManualFrameScheduler {
    queue: Mutex<Vec<(Arc<AtomicBool>, FrameTask)>>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Runs every task queued so far, skipping cancelled ones.
    ///
    /// Returns the number of tasks that actually ran.
    pub fn run_frame(&self) -> usize {
        let due = std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));

        let mut ran = 0;
        for (cancelled, task) in due {
            if !cancelled.load(Ordering::SeqCst) {
                task();
                ran += 1;
            }
        }
        ran
    }

    /// Number of queued tasks that have not been cancelled.
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(cancelled, _)| !cancelled.load(Ordering::SeqCst))
            .count()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn schedule(&self, task: FrameTask) -> FrameHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((cancelled.clone(), task));
        FrameHandle::new(cancelled)
    }
}
