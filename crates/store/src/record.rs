use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, TenantId};

/// Version number of a persisted aggregate, used for optimistic concurrency control.
///
/// A freshly created aggregate is stored at version 1. Every successful update
/// increments the stored version by exactly one; it is never decremented.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version every aggregate is created with.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A persisted aggregate row.
///
/// The aggregate's own state travels as opaque JSON; the store only interprets
/// the identity, tenant, business key, version and soft-delete columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub aggregate_type: String,

    /// Natural key that must be unique per tenant and aggregate type
    /// (a customer code, for example).
    pub business_key: Option<String>,

    /// Stored version. Ignored on writes: the store assigns it.
    pub version: Version,

    pub state: serde_json::Value,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AggregateRecord {
    /// Returns true if the record carries a soft-delete marker.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
