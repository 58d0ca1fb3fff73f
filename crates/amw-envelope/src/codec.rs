// SPDX-License-Identifier: BUSL-1.1
//! # Wire Codec
//!
//! Converts envelopes to and from the JSON wire format. Decoding is
//! two-stage: bytes that are not well-formed JSON fail with
//! [`CodecError::Deserialize`]; well-formed JSON that does not have the
//! envelope shape fails with [`CodecError::InvalidEnvelope`]. Both are
//! detected before schema validation of the payload and are distinct
//! from it.
//!
//! Round-trip law: for every envelope `e`, `decode(&encode(&e)?)? == e`
//! field for field.

use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::CodecError;

/// Serialize an envelope to wire bytes.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(envelope).map_err(CodecError::Serialize)
}

/// Deserialize wire bytes into an envelope.
pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    let value = decode_raw(bytes)?;
    serde_json::from_value(value).map_err(CodecError::InvalidEnvelope)
}

/// Deserialize wire bytes into a raw JSON document.
///
/// Used at the inbound edge, where provider documents are parsed and schema
/// validated before an envelope is built from them.
pub fn decode_raw(bytes: &[u8]) -> Result<Value, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Deserialize)
}
