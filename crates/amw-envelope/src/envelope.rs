// SPDX-License-Identifier: BUSL-1.1
//! # Envelope Record and Correlation Identifiers
//!
//! The [`Envelope`] is the unit of exchange between pipeline services.
//! [`JobId`] is a distinct newtype: you cannot pass an arbitrary UUID (or a
//! provider's own identifier) where a correlation id is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Correlation identifier for a single pipeline message.
///
/// Fresh ids are random v4 UUIDs, collision-free for the lifetime of the
/// process. Serializes as a plain UUID string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new random job identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a job identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Canonical wrapped form of a pipeline message.
///
/// Once an envelope has been serialized it is treated as immutable: no field
/// is mutated after construction, and the dispatcher never rewrites the
/// routing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique correlation id for this specific message.
    pub job_id: JobId,
    /// The `job_id` of the message that caused this one. `None` for
    /// top-level incoming messages.
    pub parent_job_id: Option<JobId>,
    /// Document/event type tag; selects the schema the payload was
    /// validated against.
    pub event: String,
    /// Destination-routing string, stable for the life of the message.
    pub routing_key: String,
    /// Creation time, set once at build time.
    pub timestamp: DateTime<Utc>,
    /// The validated, normalized document body.
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Whether this envelope was produced in response to another message.
    pub fn is_derived(&self) -> bool {
        self.parent_job_id.is_some()
    }
}
