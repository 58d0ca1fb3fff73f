// SPDX-License-Identifier: BUSL-1.1
//! Field specifications: the declarative building blocks of a schema.

use std::sync::Arc;

use crate::registry::Schema;

/// Shape check (and, for normalizing kinds, canonicalization rule) applied
/// to a single field value.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Any JSON string.
    String,
    /// A JSON integer (no fractional part).
    Integer,
    /// Any JSON number.
    Float,
    /// A JSON boolean.
    Boolean,
    /// A string restricted to a fixed set of values, matched
    /// case-insensitively and normalized to the declared lowercase form.
    OneOf(&'static [&'static str]),
    /// An International Standard Recording Code. Normalized to the compact
    /// uppercase 12-character form.
    Isrc,
    /// A Universal Product Code. Normalized to 12 digits with a valid
    /// check digit; zero-padded GTIN renderings are trimmed.
    Upc,
    /// An International Article Number. Normalized to 13 digits with a
    /// valid check digit.
    Ean,
    /// A date in one of the accepted representations. Normalized to the
    /// canonical ISO-8601 `YYYY-MM-DD` form.
    Date,
    /// A homogeneous list whose elements all satisfy the inner kind.
    List(Box<FieldKind>),
    /// A nested document validated against its own schema.
    Nested(Arc<Schema>),
}

impl FieldKind {
    /// Short name used in violation messages.
    pub(crate) fn expected(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Float => "a number",
            Self::Boolean => "a boolean",
            Self::OneOf(_) => "one of the allowed values",
            Self::Isrc => "an ISRC",
            Self::Upc => "a UPC",
            Self::Ean => "an EAN",
            Self::Date => "a date",
            Self::List(_) => "a list",
            Self::Nested(_) => "a nested document",
        }
    }
}

/// A single declared field: its shape and whether it must be present.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Whether the field must be present in the document.
    pub required: bool,
    /// The shape/normalization rule for the field's value.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// A field that must be present.
    pub fn required(kind: FieldKind) -> Self {
        Self {
            required: true,
            kind,
        }
    }

    /// A field that may be absent. When present it is still shape-checked
    /// and normalized.
    pub fn optional(kind: FieldKind) -> Self {
        Self {
            required: false,
            kind,
        }
    }
}
