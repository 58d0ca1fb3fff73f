// SPDX-License-Identifier: BUSL-1.1
//! Aggregate validation error carrying every violation found in one pass.

use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted/indexed path to the violating field (`tracks[2].isrc`).
    /// Registry-level failures use the root path `$`.
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// One or more field-level failures found while validating a document.
///
/// Validation never stops at the first violation; the `errors` list holds an
/// entry for every failing field, in the deterministic order the fields were
/// walked. Callers iterate the error to enumerate every entry.
#[derive(Debug, Clone, Error)]
#[error("document failed validation with {} violation(s): {}", .errors.len(), summarize(.errors))]
pub struct AggregateValidationError {
    /// Every violation found during the single validation pass.
    pub errors: Vec<FieldError>,
}

impl AggregateValidationError {
    /// Create an aggregate error from collected field errors.
    ///
    /// The list is expected to be non-empty; an empty list means the caller
    /// should have returned success instead.
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether there are no violations recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the violations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }
}

impl IntoIterator for AggregateValidationError {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregateValidationError {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
