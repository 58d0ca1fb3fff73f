// SPDX-License-Identifier: BUSL-1.1
//! # amw-schema — Document Validation for the Ingestion Pipeline
//!
//! Validates inbound and outbound documents against named, declaratively
//! defined schemas before they are wrapped in envelopes and dispatched.
//!
//! ## Responsibilities
//!
//! - **Aggregate validation:** a single pass over every declared field
//!   collects *all* violations (missing required fields, wrong shapes,
//!   failed normalizations) into one [`AggregateValidationError`] instead
//!   of stopping at the first failure.
//!
//! - **Normalization:** identifier fields (ISRC, UPC, EAN) are stripped of
//!   formatting, uppercased, and checked against their family's length and
//!   check-digit rules; date fields accept several input representations and
//!   come out as canonical ISO-8601 dates. Normalization is idempotent.
//!
//! - **Registry:** schemas are registered once at startup under their event
//!   name via [`SchemaRegistryBuilder`] and are immutable, shared, read-only
//!   contracts thereafter. [`catalog::delivery_registry`] provides the
//!   standard catalog-delivery document types.
//!
//! ## Design
//!
//! Schemas are data, not code: a [`Schema`] is a map of field name →
//! [`FieldSpec`], where the [`FieldKind`] carries the shape check and, for
//! normalizing kinds, the canonicalization rule. Undeclared fields pass
//! through untouched unless the schema is marked strict.

pub mod catalog;
pub mod error;
pub mod field;
pub mod normalize;
pub mod registry;
mod validator;

// Re-export primary types.
pub use error::{AggregateValidationError, FieldError};
pub use field::{FieldKind, FieldSpec};
pub use normalize::{
    normalize_date, normalize_ean, normalize_isrc, normalize_upc, NormalizeError,
};
pub use registry::{Schema, SchemaBuilder, SchemaRegistry, SchemaRegistryBuilder};
