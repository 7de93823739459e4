//! Pending buffer holding the single most recent message awaiting delivery.

use super::TelemetryMessage;

/// Outcome of offering a message to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The message replaced the buffer contents.
    Accepted,
    /// The message's sequence number did not advance past `latest`.
    Stale { seq: u64, latest: u64 },
}

/// Single-slot buffer with staleness rejection.
///
/// The buffer remembers the highest sequence number it has accepted even
/// after its message has been taken, so messages delivered across frames
/// never move backwards in sequence. Only [`PendingBuffer::reset`] forgets it.
#[derive(Debug, Clone, Default)]
pub struct PendingBuffer {
    message: Option<TelemetryMessage>,
    latest_seq: Option<u64>,
}

impl PendingBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a message, applying the replacement rule.
    ///
    /// Messages without `seq` always replace the buffer. Messages with a
    /// `seq` replace it only if `seq` is strictly greater than every
    /// sequence number accepted so far.
    pub fn offer(&mut self, message: TelemetryMessage) -> Admission {
        if let Some(seq) = message.seq {
            if let Some(latest) = self.latest_seq {
                if seq <= latest {
                    return Admission::Stale { seq, latest };
                }
            }
            self.latest_seq = Some(seq);
        }
        self.message = Some(message);
        Admission::Accepted
    }

    /// Removes and returns the buffered message, keeping the watermark.
    pub fn take(&mut self) -> Option<TelemetryMessage> {
        self.message.take()
    }

    /// Returns the buffered message without consuming it.
    pub fn peek(&self) -> Option<&TelemetryMessage> {
        self.message.as_ref()
    }

    /// Returns true if no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.message.is_none()
    }

    /// Highest sequence number accepted since the last reset.
    pub fn latest_seq(&self) -> Option<u64> {
        self.latest_seq
    }

    /// Drops the buffered message and forgets the watermark.
    pub fn reset(&mut self) {
        self.message = None;
        self.latest_seq = None;
    }
}
