// SPDX-License-Identifier: BUSL-1.1
//! # Aggregate Validator
//!
//! Walks every declared field of a schema against a document, collecting
//! every violation into one error list instead of stopping at the first
//! failure. On success the returned document has identifier and date fields
//! replaced by their canonical forms; undeclared fields are copied through
//! (or flagged, on strict schemas).

use serde_json::{Map, Value};

use crate::error::{AggregateValidationError, FieldError};
use crate::field::FieldKind;
use crate::normalize;
use crate::registry::Schema;

/// Validate `document` against `schema`, returning the normalized document
/// or every violation found.
pub(crate) fn validate_document(
    schema: &Schema,
    document: &Value,
) -> Result<Value, AggregateValidationError> {
    let mut errors = Vec::new();
    let normalized = validate_object(schema, document, "", &mut errors);

    if errors.is_empty() {
        // A valid pass over an object always produces a normalized object.
        Ok(normalized.unwrap_or(Value::Null))
    } else {
        Err(AggregateValidationError::new(errors))
    }
}

/// Validate one object level. Returns the normalized object when the value
/// was an object at all; errors are accumulated either way.
fn validate_object(
    schema: &Schema,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let map = match value.as_object() {
        Some(map) => map,
        None => {
            errors.push(FieldError::new(
                display_path(path),
                format!("expected a nested document, got {}", json_kind(value)),
            ));
            return None;
        }
    };

    let mut out = Map::with_capacity(map.len());

    // Declared fields, in name order.
    for (name, spec) in schema.fields() {
        let field_path = join_path(path, name);
        match map.get(name) {
            None => {
                if spec.required {
                    errors.push(FieldError::new(field_path, "required field is missing"));
                }
            }
            Some(value) => {
                if let Some(normalized) = check_value(&spec.kind, value, &field_path, errors) {
                    out.insert(name.clone(), normalized);
                }
            }
        }
    }

    // Undeclared fields pass through unless the schema is strict.
    for (name, value) in map {
        if !schema.fields().contains_key(name) {
            if schema.is_strict() {
                errors.push(FieldError::new(
                    join_path(path, name),
                    "field is not declared in the schema",
                ));
            } else {
                out.insert(name.clone(), value.clone());
            }
        }
    }

    Some(Value::Object(out))
}

/// Check one value against its declared kind. Returns the normalized value,
/// or `None` after recording the violation.
fn check_value(
    kind: &FieldKind,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    match kind {
        FieldKind::String => match value.as_str() {
            Some(s) => Some(Value::String(s.to_string())),
            None => {
                push_type_error(kind, value, path, errors);
                None
            }
        },
        FieldKind::Integer => {
            if value.is_i64() || value.is_u64() {
                Some(value.clone())
            } else {
                push_type_error(kind, value, path, errors);
                None
            }
        }
        FieldKind::Float => {
            if value.is_number() {
                Some(value.clone())
            } else {
                push_type_error(kind, value, path, errors);
                None
            }
        }
        FieldKind::Boolean => {
            if value.is_boolean() {
                Some(value.clone())
            } else {
                push_type_error(kind, value, path, errors);
                None
            }
        }
        FieldKind::OneOf(allowed) => match value.as_str() {
            Some(s) => {
                let lowered = s.to_ascii_lowercase();
                if allowed.contains(&lowered.as_str()) {
                    Some(Value::String(lowered))
                } else {
                    errors.push(FieldError::new(
                        path,
                        format!("must be one of: {}", allowed.join(", ")),
                    ));
                    None
                }
            }
            None => {
                push_type_error(kind, value, path, errors);
                None
            }
        },
        FieldKind::Isrc => normalize_field(kind, normalize::normalize_isrc, value, path, errors),
        FieldKind::Upc => normalize_field(kind, normalize::normalize_upc, value, path, errors),
        FieldKind::Ean => normalize_field(kind, normalize::normalize_ean, value, path, errors),
        FieldKind::Date => normalize_field(kind, normalize::normalize_date, value, path, errors),
        FieldKind::List(inner) => match value.as_array() {
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{index}]");
                    if let Some(normalized) = check_value(inner, item, &item_path, errors) {
                        out.push(normalized);
                    }
                }
                Some(Value::Array(out))
            }
            None => {
                push_type_error(kind, value, path, errors);
                None
            }
        },
        FieldKind::Nested(schema) => validate_object(schema, value, path, errors),
    }
}

/// Apply one normalizer to a string field, folding failures into the error
/// list as ordinary field entries.
fn normalize_field(
    kind: &FieldKind,
    normalizer: fn(&str) -> Result<String, normalize::NormalizeError>,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    match value.as_str() {
        Some(s) => match normalizer(s) {
            Ok(canonical) => Some(Value::String(canonical)),
            Err(err) => {
                errors.push(FieldError::new(path, err.to_string()));
                None
            }
        },
        None => {
            push_type_error(kind, value, path, errors);
            None
        }
    }
}

fn push_type_error(kind: &FieldKind, value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    errors.push(FieldError::new(
        path,
        format!("expected {}, got {}", kind.expected(), json_kind(value)),
    ));
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Root-level shape failures are reported against `$`.
fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
