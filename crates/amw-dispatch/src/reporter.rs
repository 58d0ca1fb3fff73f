// SPDX-License-Identifier: BUSL-1.1
//! # Error Reporter
//!
//! Failures that should stay visible to the rest of the pipeline (schema
//! violations, undeliverable batches, undecodable messages) are wrapped in
//! a dedicated error envelope and routed through the regular dispatch path
//! to the configured error destination.
//!
//! Reporting is best-effort: a failure to deliver the error envelope itself
//! is logged and not retried here.

use amw_envelope::{encode, Envelope, EnvelopeBuilder};
use amw_schema::AggregateValidationError;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::dispatcher::BatchDispatcher;
use crate::error::DispatchError;

/// Event tag carried by error envelopes.
pub const ERROR_EVENT: &str = "pipeline.error";

/// One field-level entry in a validation error report.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    /// Dotted/indexed path of the violating field.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

/// Structured error detail carried in an error envelope's payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorDetail {
    /// The document failed schema validation.
    Validation {
        /// Every field-level violation, in validation order.
        errors: Vec<ErrorEntry>,
    },
    /// The message bytes could not be decoded.
    Deserialization {
        /// What went wrong.
        description: String,
    },
    /// A batch could not be delivered after bounded retries.
    Dispatch {
        /// What went wrong.
        description: String,
    },
}

impl From<&AggregateValidationError> for ErrorDetail {
    fn from(err: &AggregateValidationError) -> Self {
        Self::Validation {
            errors: err
                .iter()
                .map(|e| ErrorEntry {
                    field: e.path.clone(),
                    message: e.message.clone(),
                })
                .collect(),
        }
    }
}

impl From<&DispatchError> for ErrorDetail {
    fn from(err: &DispatchError) -> Self {
        Self::Dispatch {
            description: err.to_string(),
        }
    }
}

/// Builds error envelopes and routes them through the dispatcher.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    dispatcher: BatchDispatcher,
    builder: EnvelopeBuilder,
    destination: String,
}

impl ErrorReporter {
    /// Create a reporter targeting the dispatcher's configured error
    /// destination.
    pub fn new(dispatcher: BatchDispatcher) -> Self {
        let destination = dispatcher.config().error_destination.clone();
        Self {
            dispatcher,
            builder: EnvelopeBuilder::new(),
            destination,
        }
    }

    /// The destination error envelopes are routed to.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Report a failure for a message.
    ///
    /// The error envelope's payload carries the original envelope's
    /// `job_id` and `event` plus the structured detail; its
    /// `parent_job_id` links back to the failed message. Delivery failures
    /// of the report itself are logged, not retried.
    pub async fn report(&self, original: &Envelope, detail: ErrorDetail) {
        let payload = json!({
            "job_id": original.job_id,
            "event": original.event,
            "detail": detail,
        });
        let envelope =
            self.builder
                .prepare_outgoing(ERROR_EVENT, &self.destination, payload, Some(original));

        let bytes = match encode(&envelope) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(job_id = %original.job_id, "failed to encode error envelope: {err}");
                return;
            }
        };

        match self.dispatcher.enqueue(&self.destination, bytes).await {
            Ok(()) => {
                debug!(job_id = %original.job_id, event = %original.event, "error reported");
            }
            Err(err) => {
                warn!(job_id = %original.job_id, "failed to dispatch error envelope: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::producer::MemoryProducer;
    use amw_envelope::decode;
    use amw_schema::FieldError;
    use std::sync::Arc;

    fn incoming_envelope() -> Envelope {
        EnvelopeBuilder::new()
            .prepare_incoming(json!({
                "event": "track_bundle",
                "routing_key": "ingest.track_bundle",
                "payload": {"title": "Broken Bundle"},
            }))
            .expect("envelope")
    }

    #[tokio::test]
    async fn report_routes_an_error_envelope_to_the_error_destination() {
        let producer = Arc::new(MemoryProducer::new());
        let config = DispatchConfig::default().with_destinations("in", "out", "errors");
        let dispatcher = BatchDispatcher::new(config, producer.clone());
        let reporter = ErrorReporter::new(dispatcher);

        let original = incoming_envelope();
        let validation = AggregateValidationError::new(vec![
            FieldError::new("upc", "UPC check digit mismatch: 616892587124"),
            FieldError::new("title", "required field is missing"),
        ]);
        reporter.report(&original, (&validation).into()).await;

        let sent = producer.messages_for("errors");
        assert_eq!(sent.len(), 1);

        let envelope = decode(&sent[0]).expect("well-formed error envelope");
        assert_eq!(envelope.event, ERROR_EVENT);
        assert_eq!(envelope.parent_job_id, Some(original.job_id));
        assert_eq!(envelope.payload["job_id"], json!(original.job_id));
        assert_eq!(envelope.payload["event"], "track_bundle");
        assert_eq!(envelope.payload["detail"]["kind"], "validation");
        assert_eq!(
            envelope.payload["detail"]["errors"]
                .as_array()
                .map(Vec::len),
            Some(2)
        );
    }

    #[tokio::test]
    async fn dispatch_detail_describes_the_failed_batch() {
        let failure = DispatchError::BatchFailed {
            destination: "out".to_string(),
            attempts: 4,
            batch: vec![b"m1".to_vec(), b"m2".to_vec()],
            source: crate::producer::ProducerError::Transport("unreachable".to_string()),
        };
        let detail = ErrorDetail::from(&failure);

        let rendered = serde_json::to_value(&detail).expect("serializable");
        assert_eq!(rendered["kind"], "dispatch");
        let description = rendered["description"].as_str().expect("description");
        assert!(description.contains("2 message(s)"));
        assert!(description.contains("4 attempt(s)"));
    }

    #[tokio::test]
    async fn failed_reporting_is_swallowed_and_logged() {
        // A dispatcher that is already closed rejects the report; report()
        // must not panic or propagate.
        let producer = Arc::new(MemoryProducer::new());
        let dispatcher = BatchDispatcher::new(DispatchConfig::default(), producer.clone());
        dispatcher.close().await.expect("close");
        let reporter = ErrorReporter::new(dispatcher);

        let detail = ErrorDetail::Deserialization {
            description: "malformed message bytes".to_string(),
        };
        reporter.report(&incoming_envelope(), detail).await;

        assert!(producer.messages_for("errors").is_empty());
    }

    #[test]
    fn validation_detail_preserves_entry_order() {
        let validation = AggregateValidationError::new(vec![
            FieldError::new("a", "first"),
            FieldError::new("b", "second"),
        ]);
        let detail = ErrorDetail::from(&validation);
        let rendered = serde_json::to_value(&detail).expect("serializable");
        let fields: Vec<&str> = rendered["errors"]
            .as_array()
            .expect("errors array")
            .iter()
            .map(|e| e["field"].as_str().expect("field"))
            .collect();
        assert_eq!(fields, vec!["a", "b"]);
    }
}
