// SPDX-License-Identifier: BUSL-1.1
//! # Envelope Builder
//!
//! Constructs canonical incoming and outgoing envelopes, including the
//! correlation-id fanout used when one incoming message logically produces
//! several independent outgoing messages.
//!
//! ## Metadata fields
//!
//! `prepare_incoming` reads `event` and `routing_key` from the raw decoded
//! document and takes its `payload` field as the document body (falling back
//! to the remaining fields when no `payload` key is present, so providers
//! that deliver flat documents keep working). The raw document's own
//! correlation metadata, if any, is not trusted: every accepted message gets
//! a fresh [`JobId`].

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::envelope::{Envelope, JobId};
use crate::error::EnvelopeError;

/// Metadata key holding the event tag in raw documents.
const EVENT_FIELD: &str = "event";
/// Metadata key holding the routing key in raw documents.
const ROUTING_KEY_FIELD: &str = "routing_key";
/// Metadata key holding the document body in raw documents.
const PAYLOAD_FIELD: &str = "payload";

/// Builds canonical envelopes for the pipeline.
///
/// The builder is stateless and cheap to construct; services typically keep
/// one per consumer loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeBuilder;

impl EnvelopeBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self
    }

    /// Build the canonical incoming envelope from a raw decoded document.
    ///
    /// Assigns a fresh `job_id`, stamps the creation time, and reads `event`
    /// and `routing_key` from the document's metadata. `parent_job_id` is
    /// always `None` for incoming messages.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when the document is not an object or the
    /// metadata fields are missing or mistyped.
    pub fn prepare_incoming(&self, raw: Value) -> Result<Envelope, EnvelopeError> {
        let mut doc = match raw {
            Value::Object(map) => map,
            other => {
                return Err(EnvelopeError::NotAnObject {
                    kind: json_kind(&other),
                })
            }
        };

        let event = take_string(&mut doc, EVENT_FIELD)?;
        let routing_key = take_string(&mut doc, ROUTING_KEY_FIELD)?;

        // Providers either nest the document under `payload` or deliver it
        // flat alongside the metadata keys.
        let payload = match doc.remove(PAYLOAD_FIELD) {
            Some(payload) => payload,
            None => Value::Object(doc),
        };

        let envelope = Envelope {
            job_id: JobId::new(),
            parent_job_id: None,
            event,
            routing_key,
            timestamp: Utc::now(),
            payload,
        };

        debug!(job_id = %envelope.job_id, event = %envelope.event, "prepared incoming envelope");
        Ok(envelope)
    }

    /// Build exactly one outgoing envelope.
    ///
    /// When `parent` is supplied the new envelope inherits the triggering
    /// envelope's `job_id` as its `parent_job_id`.
    pub fn prepare_outgoing(
        &self,
        event: &str,
        routing_key: &str,
        payload: Value,
        parent: Option<&Envelope>,
    ) -> Envelope {
        let envelope = Envelope {
            job_id: JobId::new(),
            parent_job_id: parent.map(|p| p.job_id),
            event: event.to_string(),
            routing_key: routing_key.to_string(),
            timestamp: Utc::now(),
            payload,
        };

        debug!(
            job_id = %envelope.job_id,
            parent_job_id = ?envelope.parent_job_id,
            event = %envelope.event,
            "prepared outgoing envelope"
        );
        envelope
    }

    /// Fan one incoming message out into several correlated outgoing
    /// envelopes, one per payload.
    ///
    /// Each envelope gets a distinct fresh `job_id` and
    /// `parent_job_id = parent`. Only the event tag, the routing key, and the
    /// parent correlation id propagate; nothing else is copied implicitly.
    pub fn fan_out(
        &self,
        event: &str,
        routing_key: &str,
        payloads: Vec<Value>,
        parent: JobId,
    ) -> Vec<Envelope> {
        let now = Utc::now();
        let envelopes: Vec<Envelope> = payloads
            .into_iter()
            .map(|payload| Envelope {
                job_id: JobId::new(),
                parent_job_id: Some(parent),
                event: event.to_string(),
                routing_key: routing_key.to_string(),
                timestamp: now,
                payload,
            })
            .collect();

        debug!(
            parent_job_id = %parent,
            event,
            count = envelopes.len(),
            "fanned out outgoing envelopes"
        );
        envelopes
    }
}

/// Remove a required string field from the document.
fn take_string(
    doc: &mut serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, EnvelopeError> {
    match doc.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(EnvelopeError::InvalidMetadata { field }),
        None => Err(EnvelopeError::MissingMetadata { field }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
