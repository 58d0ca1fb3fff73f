// SPDX-License-Identifier: BUSL-1.1
//! Dispatch configuration.
//!
//! An explicit value object handed to the dispatcher at startup; there is no
//! process-wide mutable settings state inside the core. The settings
//! collaborator that owns environment loading builds one of these and passes
//! it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for [`BatchDispatcher`](crate::BatchDispatcher) and the
/// error-reporting path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Whether to buffer messages per destination. When `false`, every
    /// enqueue dispatches immediately as a single-message batch.
    pub batch_send: bool,
    /// Flush a destination once this many messages are buffered.
    pub batch_count: usize,
    /// Flush a destination once its oldest pending message is this old.
    pub batch_max_age: Duration,
    /// A producer send that takes longer than this is treated as a
    /// transient failure and retried.
    pub send_timeout: Duration,
    /// Retry attempts after the initial send before a batch is failed.
    pub max_retries: u32,
    /// Base delay between retries; doubles each attempt.
    pub retry_base_delay: Duration,
    /// Destination the pipeline consumes from.
    pub inbound_destination: String,
    /// Destination outgoing messages are routed to.
    pub outbound_destination: String,
    /// Destination error envelopes are routed to.
    pub error_destination: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_send: false,
            batch_count: 20,
            batch_max_age: Duration::from_secs(60),
            send_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
            inbound_destination: String::new(),
            outbound_destination: "outbound".to_string(),
            error_destination: "errors".to_string(),
        }
    }
}

impl DispatchConfig {
    /// Enable batching with the given count and age thresholds.
    pub fn with_batching(mut self, batch_count: usize, batch_max_age: Duration) -> Self {
        self.batch_send = true;
        self.batch_count = batch_count;
        self.batch_max_age = batch_max_age;
        self
    }

    /// Set the inbound/outbound/error destination identifiers.
    pub fn with_destinations(
        mut self,
        inbound: impl Into<String>,
        outbound: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        self.inbound_destination = inbound.into();
        self.outbound_destination = outbound.into();
        self.error_destination = error.into();
        self
    }

    /// Set the retry policy for failed sends.
    pub fn with_retry_policy(mut self, max_retries: u32, retry_base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = retry_base_delay;
        self
    }
}
