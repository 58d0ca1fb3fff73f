// SPDX-License-Identifier: BUSL-1.1
//! Dispatch error type.

use thiserror::Error;

use crate::producer::ProducerError;

/// Errors surfaced by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The producer rejected or kept timing out on a batch after the
    /// configured retries. Carries every undelivered message so the caller
    /// can account for them (report, park, or re-enqueue).
    #[error(
        "batch of {} message(s) for `{destination}` failed after {attempts} attempt(s): {source}",
        .batch.len()
    )]
    BatchFailed {
        /// Destination the batch was bound for.
        destination: String,
        /// Total send attempts made, including the first.
        attempts: u32,
        /// The undelivered messages, in enqueue order.
        batch: Vec<Vec<u8>>,
        /// The producer failure from the final attempt.
        source: ProducerError,
    },

    /// The dispatcher has been closed; no further messages are accepted.
    #[error("dispatcher is closed")]
    Closed,
}

impl DispatchError {
    /// Destination the error relates to, if any.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::BatchFailed { destination, .. } => Some(destination),
            Self::Closed => None,
        }
    }
}
