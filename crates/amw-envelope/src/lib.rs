// SPDX-License-Identifier: BUSL-1.1
//! # amw-envelope — Message Envelopes for the Ingestion Pipeline
//!
//! Every message exchanged between pipeline services travels inside an
//! [`Envelope`]: a wrapper carrying correlation identifiers ([`JobId`] /
//! parent job id), the event tag that selects the applicable schema, a
//! routing key, a creation timestamp, and the document payload.
//!
//! ## Message flow
//!
//! ```text
//! raw bytes ──decode_raw──▶ Value ──(schema validation)──▶ prepare_incoming
//!                                                               │
//!                                            [service business logic]
//!                                                               │
//!              prepare_outgoing / fan_out ──(schema validation)──▶ encode ──▶ dispatch
//! ```
//!
//! Envelope construction never blocks or suspends; the only I/O in the
//! pipeline core happens at the dispatch boundary.
//!
//! ## Correlation
//!
//! `prepare_incoming` assigns every accepted message a fresh [`JobId`].
//! Outgoing messages built from an incoming one inherit that id as their
//! `parent_job_id`, so a one-to-many fanout (one release event producing one
//! message per track) stays traceable end to end.

pub mod builder;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod provider;

// Re-export primary types.
pub use builder::EnvelopeBuilder;
pub use codec::{decode, decode_raw, encode};
pub use envelope::{Envelope, JobId};
pub use error::{CodecError, EnvelopeError};
pub use provider::ProviderFilter;
