// SPDX-License-Identifier: BUSL-1.1
//! # Schema Registry
//!
//! Schemas are declared with [`SchemaBuilder`], registered under their event
//! name with [`SchemaRegistryBuilder`], and frozen into an immutable
//! [`SchemaRegistry`] before the first message is processed. There is no
//! mutable registry state after startup; the registry is shared read-only
//! across all validation calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AggregateValidationError, FieldError};
use crate::field::{FieldKind, FieldSpec};
use crate::validator;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A named, immutable validation contract.
///
/// Fields are walked in name order, so the entries of an aggregate error are
/// deterministic for a given document.
#[derive(Debug)]
pub struct Schema {
    name: String,
    strict: bool,
    fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    /// Start declaring a schema.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            strict: false,
            fields: BTreeMap::new(),
        }
    }

    /// The schema's name (the event tag it is registered under).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether undeclared fields are violations.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub(crate) fn fields(&self) -> &BTreeMap<String, FieldSpec> {
        &self.fields
    }

    /// Validate a document against this schema.
    ///
    /// Returns the normalized document on success. On failure the error
    /// carries an entry for every violating field found in the single pass.
    pub fn validate(&self, document: &Value) -> Result<Value, AggregateValidationError> {
        validator::validate_document(self, document)
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    strict: bool,
    fields: BTreeMap<String, FieldSpec>,
}

impl SchemaBuilder {
    /// Declare a required field.
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), FieldSpec::required(kind));
        self
    }

    /// Declare an optional field. When present it is still shape-checked
    /// and normalized.
    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), FieldSpec::optional(kind));
        self
    }

    /// Treat undeclared fields as violations instead of passing them
    /// through.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Copy every field declaration from a base schema. Fields declared on
    /// this builder afterwards override the copied ones.
    pub fn extend(mut self, base: &Schema) -> Self {
        for (name, spec) in base.fields() {
            self.fields.insert(name.clone(), spec.clone());
        }
        self
    }

    /// Freeze the schema.
    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            name: self.name,
            strict: self.strict,
            fields: self.fields,
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Event name → schema mapping, built once at startup and read-only
/// thereafter.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Start building a registry.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            schemas: HashMap::new(),
        }
    }

    /// Look up the schema registered for an event.
    pub fn get(&self, event: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(event)
    }

    /// The registered event names.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Validate a document against the schema registered for `event`.
    ///
    /// An unregistered event is itself a validation failure, reported as a
    /// single root-level entry.
    pub fn validate(
        &self,
        event: &str,
        document: &Value,
    ) -> Result<Value, AggregateValidationError> {
        match self.schemas.get(event) {
            Some(schema) => schema.validate(document),
            None => Err(AggregateValidationError::new(vec![FieldError::new(
                "$",
                format!("no schema registered for event `{event}`"),
            )])),
        }
    }
}

/// Builder for [`SchemaRegistry`].
#[derive(Debug)]
pub struct SchemaRegistryBuilder {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistryBuilder {
    /// Register a schema under its own name. A later registration under the
    /// same name replaces the earlier one.
    pub fn register(mut self, schema: Arc<Schema>) -> Self {
        self.schemas.insert(schema.name().to_string(), schema);
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn release_schema() -> Arc<Schema> {
        Schema::builder("release")
            .required("date", FieldKind::Date)
            .required("year", FieldKind::Integer)
            .build()
    }

    #[test]
    fn registry_routes_by_event_name() {
        let registry = SchemaRegistry::builder().register(release_schema()).build();

        let normalized = registry
            .validate("release", &json!({"date": "03/25/2016", "year": 2016}))
            .expect("valid document");
        assert_eq!(normalized["date"], "2016-03-25");
    }

    #[test]
    fn unknown_event_is_a_root_level_failure() {
        let registry = SchemaRegistry::builder().build();
        let err = registry.validate("mystery", &json!({})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors[0].path, "$");
        assert!(err.errors[0].message.contains("mystery"));
    }

    #[test]
    fn extend_copies_and_overrides_fields() {
        let base = Schema::builder("base")
            .required("title", FieldKind::String)
            .optional("version", FieldKind::String)
            .build();
        let extended = Schema::builder("extended")
            .extend(&base)
            .required("version", FieldKind::String)
            .build();

        // `title` is inherited, `version` is now required.
        let err = extended.validate(&json!({})).unwrap_err();
        let paths: Vec<_> = err.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["title", "version"]);
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let relaxed = Schema::builder("doc").build();
        let demanding = Schema::builder("doc")
            .required("id", FieldKind::String)
            .build();
        let registry = SchemaRegistry::builder()
            .register(relaxed)
            .register(demanding)
            .build();

        assert!(registry.validate("doc", &json!({})).is_err());
    }
}
