// SPDX-License-Identifier: BUSL-1.1
//! Retry logic with exponential backoff for producer sends.
//!
//! Every producer failure is treated as transient at this layer; the
//! dispatcher decides what an exhausted retry budget means for the batch.

use std::time::Duration;

use crate::producer::ProducerError;

/// Run a send attempt up to `max_retries + 1` times with doubling backoff.
///
/// Delays between attempts: `base_delay`, `2 * base_delay`,
/// `4 * base_delay`, ... The final attempt's error is returned when the
/// budget is exhausted.
pub(crate) async fn send_with_backoff<F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    f: F,
) -> Result<(), ProducerError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<(), ProducerError>>,
{
    // Retry attempts with backoff, then one final attempt without.
    for attempt in 0..max_retries {
        match f().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                let delay = base_delay * 2u32.saturating_pow(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    "producer send failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    f().await
}
