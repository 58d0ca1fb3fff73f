// SPDX-License-Identifier: BUSL-1.1
//! # Producer Capability
//!
//! The dispatcher's only view of the broker: an object-safe async trait
//! taking one batch of serialized messages for one destination. The broker
//! client (connection management, topic administration) lives behind this
//! boundary and is expected to provide at-least-once delivery on success.

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

/// A failure reported by the producer capability.
///
/// The dispatcher treats every producer failure as transient and retries
/// with backoff up to its configured bound.
#[derive(Debug, Clone, Error)]
pub enum ProducerError {
    /// The broker could not be reached, or the send timed out.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The broker refused the batch.
    #[error("batch rejected: {0}")]
    Rejected(String),
}

/// Capability for handing batches of serialized messages to a broker.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Deliver one batch to one destination.
    ///
    /// Success means every message in the batch was accepted with
    /// at-least-once semantics. Implementations should not reorder the
    /// batch.
    async fn send(&self, destination: &str, batch: Vec<Vec<u8>>) -> Result<(), ProducerError>;
}

/// In-memory producer that records every batch it receives.
///
/// Stands in for the broker client in tests and local development.
#[derive(Debug, Default)]
pub struct MemoryProducer {
    batches: Mutex<Vec<(String, Vec<Vec<u8>>)>>,
}

impl MemoryProducer {
    /// Create an empty recording producer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(destination, batch)` pair received so far, in arrival order.
    pub fn batches(&self) -> Vec<(String, Vec<Vec<u8>>)> {
        self.batches.lock().clone()
    }

    /// All messages delivered to one destination, flattened across batches.
    pub fn messages_for(&self, destination: &str) -> Vec<Vec<u8>> {
        self.batches
            .lock()
            .iter()
            .filter(|(dest, _)| dest == destination)
            .flat_map(|(_, batch)| batch.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl Producer for MemoryProducer {
    async fn send(&self, destination: &str, batch: Vec<Vec<u8>>) -> Result<(), ProducerError> {
        self.batches.lock().push((destination.to_string(), batch));
        Ok(())
    }
}
