// SPDX-License-Identifier: BUSL-1.1
//! Per-destination batch buffer: an ordered queue of pending serialized
//! messages plus the enqueue instant of the oldest one. Guarded externally;
//! drained, never destroyed, on flush.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Default)]
pub(crate) struct BatchBuffer {
    messages: Vec<Vec<u8>>,
    oldest_enqueued_at: Option<Instant>,
}

impl BatchBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a message, starting the age clock if the buffer was empty.
    pub(crate) fn push(&mut self, message: Vec<u8>) {
        if self.messages.is_empty() {
            self.oldest_enqueued_at = Some(Instant::now());
        }
        self.messages.push(message);
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Instant at which the oldest pending message reaches `max_age`.
    pub(crate) fn age_deadline(&self, max_age: Duration) -> Option<Instant> {
        self.oldest_enqueued_at.map(|oldest| oldest + max_age)
    }

    /// Whether the oldest pending message has reached `max_age`.
    pub(crate) fn is_due(&self, max_age: Duration) -> bool {
        self.oldest_enqueued_at
            .is_some_and(|oldest| oldest.elapsed() >= max_age)
    }

    /// Snapshot of every pending message, in enqueue order. The buffer is
    /// unchanged, so a flush cancelled mid-send leaves nothing lost.
    pub(crate) fn clone_messages(&self) -> Vec<Vec<u8>> {
        self.messages.clone()
    }

    /// Take every pending message, in enqueue order, resetting the age
    /// clock. The buffer itself stays usable for the next accumulation
    /// cycle.
    pub(crate) fn take_batch(&mut self) -> Vec<Vec<u8>> {
        self.oldest_enqueued_at = None;
        std::mem::take(&mut self.messages)
    }
}
