// SPDX-License-Identifier: BUSL-1.1
//! # amw-dispatch — Batched Message Dispatch
//!
//! Buffers serialized outgoing messages per destination and hands them to an
//! external [`Producer`] capability in batches, flushing whichever comes
//! first: the configured count threshold or the configured age of the oldest
//! pending message.
//!
//! ## Guarantees
//!
//! - **Per-destination atomicity:** a flush either delivers the whole batch
//!   and clears it, or (after bounded retries) surfaces a
//!   [`DispatchError::BatchFailed`] carrying every undelivered message;
//!   nothing is silently dropped.
//! - **Ordering:** messages enqueued to one destination flush in enqueue
//!   order within a batch. Nothing is guaranteed across destinations or
//!   across flush cycles.
//! - **Draining shutdown:** [`BatchDispatcher::close`] force-flushes every
//!   destination before the producer is released. Dropping the dispatcher
//!   without calling `close` may lose buffered messages.
//!
//! With batching disabled in [`DispatchConfig`], every enqueue dispatches
//! immediately as a single-message batch and no buffer is retained.
//!
//! Validation and envelope construction never suspend; the producer send at
//! the flush boundary is the pipeline core's only suspension point.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod producer;
pub mod reporter;

mod buffer;
mod retry;

// Re-export main types.
pub use config::DispatchConfig;
pub use dispatcher::BatchDispatcher;
pub use error::DispatchError;
pub use producer::{MemoryProducer, Producer, ProducerError};
pub use reporter::{ErrorDetail, ErrorReporter, ERROR_EVENT};
