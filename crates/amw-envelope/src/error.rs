// SPDX-License-Identifier: BUSL-1.1
//! Error types for envelope construction and the wire codec.

use thiserror::Error;

/// Errors raised while building an envelope from a raw document.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The raw document is not a JSON object.
    #[error("raw document is not an object, got {kind}")]
    NotAnObject {
        /// JSON type of the value that was received instead.
        kind: &'static str,
    },

    /// A required metadata field is absent from the raw document.
    #[error("raw document is missing metadata field `{field}`")]
    MissingMetadata {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A metadata field is present but has the wrong type.
    #[error("metadata field `{field}` must be a string")]
    InvalidMetadata {
        /// Name of the mistyped field.
        field: &'static str,
    },
}

/// Errors raised by the wire codec.
///
/// A deserialization failure is fatal to that single message. It is detected
/// before schema validation of the decoded content and is distinct from it.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not well-formed JSON.
    #[error("malformed message bytes: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The bytes parse as JSON but do not have the envelope shape.
    #[error("message does not conform to the envelope format: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    /// The envelope could not be serialized.
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[source] serde_json::Error),
}
