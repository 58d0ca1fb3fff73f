// SPDX-License-Identifier: BUSL-1.1
//! # Batch Dispatcher
//!
//! Per destination the dispatcher runs a small state machine:
//! idle → accumulating → flushing → idle. Messages accumulate in the
//! destination's buffer until either the count threshold is reached (flushed
//! inline by the enqueueing task) or the oldest pending message reaches the
//! age threshold (flushed by the destination's timer task).
//!
//! Each destination's buffer is one exclusive resource: enqueue and flush
//! both take its lock, and a flush holds the lock across the producer send,
//! so a batch is removed from the buffer only once the send has actually
//! completed. A flush cancelled mid-send (shutdown racing a timer) therefore
//! leaves the buffer intact for the drain. Distinct destinations are
//! independent and flush concurrently.
//!
//! Failure policy: producer failures (including sends exceeding the
//! configured timeout) retry with exponential backoff up to the configured
//! bound. Exhaustion fails the batch: the buffer starts a fresh accumulation
//! cycle and the error, which carries every undelivered message, propagates
//! to the enqueueing caller, or, for timer-driven flushes, is published on
//! the failure channel and logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::buffer::BatchBuffer;
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::producer::{Producer, ProducerError};
use crate::retry;

/// Batching dispatcher: buffers serialized messages per destination and
/// flushes them to the producer capability on count or age triggers.
///
/// Cheap to clone; clones share the same buffers and producer.
#[derive(Clone)]
pub struct BatchDispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: DispatchConfig,
    producer: Arc<dyn Producer>,
    destinations: DashMap<String, Arc<Destination>>,
    failures_tx: mpsc::UnboundedSender<DispatchError>,
    failures_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<DispatchError>>>,
    closed: AtomicBool,
}

/// Per-destination state. The buffer mutex is the destination's single
/// exclusive resource; the timer handle and wakeup signal drive age-based
/// flushes.
struct Destination {
    name: String,
    buffer: tokio::sync::Mutex<BatchBuffer>,
    wakeup: Notify,
    timer: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl BatchDispatcher {
    /// Create a dispatcher over a producer capability.
    ///
    /// Must be called within a tokio runtime when batching is enabled: the
    /// per-destination timer tasks are spawned on the current runtime.
    pub fn new(config: DispatchConfig, producer: Arc<dyn Producer>) -> Self {
        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                config,
                producer,
                destinations: DashMap::new(),
                failures_tx,
                failures_rx: parking_lot::Mutex::new(Some(failures_rx)),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The dispatcher's configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Take the receiver for timer-driven flush failures.
    ///
    /// Can be taken once; `None` afterwards. Failures are also logged, so
    /// leaving the channel untaken loses no information, only the messages'
    /// bytes.
    pub fn take_failures(&self) -> Option<mpsc::UnboundedReceiver<DispatchError>> {
        self.inner.failures_rx.lock().take()
    }

    /// Append a serialized message to a destination's buffer.
    ///
    /// With batching disabled this is an immediate synchronous flush of a
    /// single-message batch. With batching enabled, reaching the count
    /// threshold flushes inline; otherwise the message waits for the count
    /// or age trigger.
    ///
    /// # Errors
    ///
    /// [`DispatchError::BatchFailed`] when this call triggered a flush and
    /// the producer failed after bounded retries; the error carries every
    /// undelivered message. [`DispatchError::Closed`] after [`close`].
    ///
    /// [`close`]: BatchDispatcher::close
    pub async fn enqueue(&self, destination: &str, message: Vec<u8>) -> Result<(), DispatchError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(DispatchError::Closed);
        }

        if !self.inner.config.batch_send {
            return send_batch(
                &self.inner.config,
                self.inner.producer.as_ref(),
                destination,
                vec![message],
            )
            .await;
        }

        let dest = self.destination(destination);
        let mut buffer = dest.buffer.lock().await;
        let was_empty = buffer.is_empty();
        buffer.push(message);
        debug!(destination, pending = buffer.len(), "message enqueued");

        if buffer.len() >= self.inner.config.batch_count {
            debug!(
                destination,
                count = buffer.len(),
                "count threshold reached, flushing"
            );
            flush_locked(
                &self.inner.config,
                self.inner.producer.as_ref(),
                destination,
                &mut buffer,
            )
            .await
        } else {
            if was_empty {
                // First message of a cycle starts the age clock; wake the
                // timer so it picks up the new deadline.
                dest.wakeup.notify_one();
            }
            Ok(())
        }
    }

    /// Force-flush one destination regardless of thresholds.
    pub async fn flush(&self, destination: &str) -> Result<(), DispatchError> {
        let Some(dest) = self
            .inner
            .destinations
            .get(destination)
            .map(|entry| entry.value().clone())
        else {
            return Ok(());
        };

        let mut buffer = dest.buffer.lock().await;
        flush_locked(
            &self.inner.config,
            self.inner.producer.as_ref(),
            destination,
            &mut buffer,
        )
        .await
    }

    /// Graceful shutdown: stop the timers, drain every destination's buffer
    /// regardless of thresholds, and only then release the producer.
    ///
    /// Partial progress is possible: destinations drain independently and
    /// one failing does not stop the others. The first failure is returned;
    /// any further ones are published on the failure channel and logged.
    ///
    /// Dropping the dispatcher without calling `close` aborts the timers
    /// and may lose buffered messages.
    pub async fn close(&self) -> Result<(), DispatchError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let destinations: Vec<Arc<Destination>> = self
            .inner
            .destinations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        // Stop the timers first; an aborted mid-send flush leaves its
        // messages in the buffer, so the drain below still sees them.
        for dest in &destinations {
            if let Some(task) = dest.timer.lock().take() {
                task.abort();
            }
        }

        let mut first_error = None;
        for dest in &destinations {
            let mut buffer = dest.buffer.lock().await;
            if buffer.is_empty() {
                continue;
            }
            debug!(
                destination = %dest.name,
                count = buffer.len(),
                "draining destination on shutdown"
            );
            if let Err(err) = flush_locked(
                &self.inner.config,
                self.inner.producer.as_ref(),
                &dest.name,
                &mut buffer,
            )
            .await
            {
                error!(destination = %dest.name, "failed to drain destination on shutdown: {err}");
                if first_error.is_none() {
                    first_error = Some(err);
                } else if self.inner.failures_tx.send(err).is_err() {
                    warn!("failure channel receiver dropped during shutdown drain");
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Look up or lazily create a destination, spawning its timer task on
    /// first use.
    fn destination(&self, name: &str) -> Arc<Destination> {
        let dest = self
            .inner
            .destinations
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Destination {
                    name: name.to_string(),
                    buffer: tokio::sync::Mutex::new(BatchBuffer::new()),
                    wakeup: Notify::new(),
                    timer: parking_lot::Mutex::new(None),
                })
            })
            .value()
            .clone();

        let mut timer = dest.timer.lock();
        if timer.is_none() && !self.inner.closed.load(Ordering::SeqCst) {
            *timer = Some(tokio::spawn(run_timer(
                dest.clone(),
                self.inner.producer.clone(),
                self.inner.config.clone(),
                self.inner.failures_tx.clone(),
            )));
        }
        drop(timer);

        dest
    }
}

impl std::fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("destinations", &self.inner.destinations.len())
            .field("batch_send", &self.inner.config.batch_send)
            .finish()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.destinations.iter() {
            if let Some(task) = entry.value().timer.lock().take() {
                task.abort();
            }
        }
    }
}

/// Timer task: one per active destination. Sleeps until the oldest pending
/// message reaches the age threshold, then flushes whatever is buffered.
async fn run_timer(
    dest: Arc<Destination>,
    producer: Arc<dyn Producer>,
    config: DispatchConfig,
    failures: mpsc::UnboundedSender<DispatchError>,
) {
    loop {
        let deadline = { dest.buffer.lock().await.age_deadline(config.batch_max_age) };
        match deadline {
            // Empty buffer: wait for the first enqueue of the next cycle.
            None => dest.wakeup.notified().await,
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;

                let mut buffer = dest.buffer.lock().await;
                if !buffer.is_due(config.batch_max_age) {
                    // A count-triggered flush emptied the buffer while we
                    // slept; recompute against the new cycle.
                    continue;
                }
                debug!(
                    destination = %dest.name,
                    count = buffer.len(),
                    "age threshold reached, flushing"
                );
                if let Err(err) =
                    flush_locked(&config, producer.as_ref(), &dest.name, &mut buffer).await
                {
                    drop(buffer);
                    error!(destination = %dest.name, "batch flush failed: {err}");
                    if failures.send(err).is_err() {
                        warn!(destination = %dest.name, "failure channel receiver dropped");
                    }
                }
            }
        }
    }
}

/// Flush a destination's buffer while holding its lock.
///
/// The batch is removed from the buffer only after the send completes
/// (successfully or fatally); cancellation mid-send leaves the buffer
/// intact.
async fn flush_locked(
    config: &DispatchConfig,
    producer: &dyn Producer,
    destination: &str,
    buffer: &mut BatchBuffer,
) -> Result<(), DispatchError> {
    if buffer.is_empty() {
        return Ok(());
    }

    let batch = buffer.clone_messages();
    let result = send_batch(config, producer, destination, batch).await;

    // Success delivered them; failure surfaced them inside the error.
    // Either way this accumulation cycle is over.
    buffer.take_batch();
    result
}

/// Send one batch with timeout and bounded backoff retries.
async fn send_batch(
    config: &DispatchConfig,
    producer: &dyn Producer,
    destination: &str,
    batch: Vec<Vec<u8>>,
) -> Result<(), DispatchError> {
    let send_timeout = config.send_timeout;
    let result = retry::send_with_backoff(config.max_retries, config.retry_base_delay, || {
        let batch = batch.clone();
        async move {
            match tokio::time::timeout(send_timeout, producer.send(destination, batch)).await {
                Ok(result) => result,
                Err(_) => Err(ProducerError::Transport(format!(
                    "send to `{destination}` timed out after {send_timeout:?}"
                ))),
            }
        }
    })
    .await;

    match result {
        Ok(()) => {
            debug!(destination, count = batch.len(), "batch delivered");
            Ok(())
        }
        Err(source) => Err(DispatchError::BatchFailed {
            destination: destination.to_string(),
            attempts: config.max_retries + 1,
            batch,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::MemoryProducer;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    /// Producer that always fails with a transport error.
    #[derive(Debug, Default)]
    struct FailingProducer {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Producer for FailingProducer {
        async fn send(&self, _destination: &str, _batch: Vec<Vec<u8>>) -> Result<(), ProducerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProducerError::Transport("broker unreachable".to_string()))
        }
    }

    /// Producer whose sends never complete.
    #[derive(Debug, Default)]
    struct HangingProducer;

    #[async_trait]
    impl Producer for HangingProducer {
        async fn send(&self, _destination: &str, _batch: Vec<Vec<u8>>) -> Result<(), ProducerError> {
            std::future::pending::<()>().await;
            unreachable!("pending future never resolves")
        }
    }

    fn batching_config(count: usize, age: Duration) -> DispatchConfig {
        DispatchConfig::default()
            .with_batching(count, age)
            .with_retry_policy(0, Duration::from_millis(1))
    }

    fn msg(text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }

    #[tokio::test]
    async fn disabled_batching_sends_immediately() {
        let producer = Arc::new(MemoryProducer::new());
        let dispatcher = BatchDispatcher::new(DispatchConfig::default(), producer.clone());

        dispatcher.enqueue("out", msg("one")).await.unwrap();
        dispatcher.enqueue("out", msg("two")).await.unwrap();

        // Two single-message batches, not one batch of two.
        let batches = producer.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].1, vec![msg("one")]);
        assert_eq!(batches[1].1, vec![msg("two")]);
    }

    #[tokio::test]
    async fn count_threshold_flushes_exactly_one_batch_in_order() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(3, Duration::from_secs(3600));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        dispatcher.enqueue("out", msg("one")).await.unwrap();
        dispatcher.enqueue("out", msg("two")).await.unwrap();
        assert!(producer.batches().is_empty(), "below threshold, no flush");

        dispatcher.enqueue("out", msg("three")).await.unwrap();

        let batches = producer.batches();
        assert_eq!(batches.len(), 1, "exactly one flush");
        assert_eq!(batches[0].1, vec![msg("one"), msg("two"), msg("three")]);
    }

    #[tokio::test(start_paused = true)]
    async fn age_threshold_flushes_a_single_pending_message() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(100, Duration::from_secs(5));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        dispatcher.enqueue("out", msg("lonely")).await.unwrap();
        assert!(producer.batches().is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;

        let batches = producer.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1, vec![msg("lonely")]);
    }

    #[tokio::test(start_paused = true)]
    async fn age_clock_restarts_with_each_cycle() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(100, Duration::from_secs(5));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        dispatcher.enqueue("out", msg("first")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(producer.batches().len(), 1);

        dispatcher.enqueue("out", msg("second")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        let batches = producer.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].1, vec![msg("second")]);
    }

    #[tokio::test(start_paused = true)]
    async fn count_trigger_beats_a_pending_age_trigger() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(2, Duration::from_secs(5));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        dispatcher.enqueue("out", msg("one")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        dispatcher.enqueue("out", msg("two")).await.unwrap();

        // Count flushed at 2s; nothing further happens at the 5s mark.
        tokio::time::sleep(Duration::from_secs(10)).await;
        let batches = producer.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1, vec![msg("one"), msg("two")]);
    }

    #[tokio::test]
    async fn destinations_buffer_independently() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(2, Duration::from_secs(3600));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        dispatcher.enqueue("a", msg("a1")).await.unwrap();
        dispatcher.enqueue("b", msg("b1")).await.unwrap();
        assert!(producer.batches().is_empty(), "separate buffers, no flush");

        dispatcher.enqueue("a", msg("a2")).await.unwrap();
        assert_eq!(producer.batches().len(), 1);
        assert_eq!(producer.messages_for("a"), vec![msg("a1"), msg("a2")]);
        assert!(producer.messages_for("b").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhausted_surfaces_batch_failed_with_messages() {
        let producer = Arc::new(FailingProducer::default());
        let config = DispatchConfig::default().with_retry_policy(2, Duration::from_millis(10));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        let err = dispatcher.enqueue("out", msg("doomed")).await.unwrap_err();

        match err {
            DispatchError::BatchFailed {
                destination,
                attempts,
                batch,
                ..
            } => {
                assert_eq!(destination, "out");
                assert_eq!(attempts, 3);
                assert_eq!(batch, vec![msg("doomed")], "messages are accounted for");
            }
            other => panic!("expected BatchFailed, got {other:?}"),
        }
        assert_eq!(producer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_send_is_a_transient_timeout_failure() {
        let producer = Arc::new(HangingProducer);
        let mut config = DispatchConfig::default().with_retry_policy(0, Duration::from_millis(1));
        config.send_timeout = Duration::from_secs(1);
        let dispatcher = BatchDispatcher::new(config, producer);

        let err = dispatcher.enqueue("out", msg("stuck")).await.unwrap_err();
        match err {
            DispatchError::BatchFailed { source, .. } => {
                assert!(source.to_string().contains("timed out"), "got: {source}");
            }
            other => panic!("expected BatchFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_batch_clears_the_buffer_for_the_next_cycle() {
        let producer = Arc::new(FailingProducer::default());
        let config = DispatchConfig::default()
            .with_batching(1, Duration::from_secs(3600))
            .with_retry_policy(0, Duration::from_millis(1));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        assert!(dispatcher.enqueue("out", msg("first")).await.is_err());

        // The poisoned batch is gone; the next message fails on its own.
        let err = dispatcher.enqueue("out", msg("second")).await.unwrap_err();
        match err {
            DispatchError::BatchFailed { batch, .. } => {
                assert_eq!(batch, vec![msg("second")]);
            }
            other => panic!("expected BatchFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timer_flush_failures_reach_the_failure_channel() {
        let producer = Arc::new(FailingProducer::default());
        let config = DispatchConfig::default()
            .with_batching(100, Duration::from_secs(1))
            .with_retry_policy(0, Duration::from_millis(1));
        let dispatcher = BatchDispatcher::new(config, producer);
        let mut failures = dispatcher.take_failures().expect("first take");
        assert!(dispatcher.take_failures().is_none(), "receiver taken once");

        dispatcher.enqueue("out", msg("doomed")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let err = failures.try_recv().expect("failure published");
        assert!(matches!(err, DispatchError::BatchFailed { ref batch, .. } if batch.len() == 1));
    }

    #[tokio::test]
    async fn close_drains_every_destination() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(100, Duration::from_secs(3600));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        dispatcher.enqueue("a", msg("a1")).await.unwrap();
        dispatcher.enqueue("a", msg("a2")).await.unwrap();
        dispatcher.enqueue("b", msg("b1")).await.unwrap();
        assert!(producer.batches().is_empty());

        dispatcher.close().await.unwrap();

        assert_eq!(producer.messages_for("a"), vec![msg("a1"), msg("a2")]);
        assert_eq!(producer.messages_for("b"), vec![msg("b1")]);
    }

    #[tokio::test]
    async fn enqueue_after_close_is_rejected() {
        let producer = Arc::new(MemoryProducer::new());
        let dispatcher =
            BatchDispatcher::new(batching_config(10, Duration::from_secs(60)), producer);

        dispatcher.close().await.unwrap();
        let err = dispatcher.enqueue("out", msg("late")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Closed));
    }

    #[tokio::test]
    async fn explicit_flush_ignores_thresholds() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(100, Duration::from_secs(3600));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        dispatcher.enqueue("out", msg("waiting")).await.unwrap();
        dispatcher.flush("out").await.unwrap();

        assert_eq!(producer.messages_for("out"), vec![msg("waiting")]);
        // Flushing an unknown or empty destination is a no-op.
        dispatcher.flush("out").await.unwrap();
        dispatcher.flush("never-seen").await.unwrap();
        assert_eq!(producer.batches().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_enqueues_from_many_tasks_lose_nothing() {
        let producer = Arc::new(MemoryProducer::new());
        let config = batching_config(10, Duration::from_secs(3600));
        let dispatcher = BatchDispatcher::new(config, producer.clone());

        let mut handles = Vec::new();
        for task in 0..4 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    dispatcher
                        .enqueue("out", msg(&format!("{task}-{i}")))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        dispatcher.close().await.unwrap();

        assert_eq!(producer.messages_for("out").len(), 100);
    }
}
