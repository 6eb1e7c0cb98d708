//! Outbox entries and the contract the relay process consumes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{AggregateId, Result, StoreError, TenantId};

/// Unique identifier for an outbox entry.
///
/// Consumers of relayed events deduplicate on this id, since delivery is
/// at-least-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboxEntryId(Uuid);

impl OutboxEntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OutboxEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OutboxEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One domain event recorded in the same transaction as the state change
/// that produced it.
///
/// Entries are append-only from the point of view of the mutation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: OutboxEntryId,

    /// Copied from the aggregate so the relay can route per tenant.
    pub tenant_id: TenantId,

    pub aggregate_type: String,
    pub aggregate_id: AggregateId,

    /// Stable event type string, e.g. `customer.created`.
    pub event_type: String,

    /// Serialized event.
    pub payload: Vec<u8>,

    pub created_at: DateTime<Utc>,
}

impl OutboxEntry {
    pub fn builder() -> OutboxEntryBuilder {
        OutboxEntryBuilder::default()
    }

    /// Decodes the payload as JSON.
    pub fn payload_json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Builder for outbox entries.
#[derive(Debug, Default)]
pub struct OutboxEntryBuilder {
    id: Option<OutboxEntryId>,
    tenant_id: Option<TenantId>,
    aggregate_type: Option<String>,
    aggregate_id: Option<AggregateId>,
    event_type: Option<String>,
    payload: Option<Vec<u8>>,
    created_at: Option<DateTime<Utc>>,
}

impl OutboxEntryBuilder {
    /// Sets the entry id. A new id is generated if not set.
    pub fn id(mut self, id: OutboxEntryId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn aggregate_id(mut self, aggregate_id: AggregateId) -> Self {
        self.aggregate_id = Some(aggregate_id);
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Serializes the payload as JSON.
    pub fn payload<T: Serialize>(
        mut self,
        payload: &T,
    ) -> std::result::Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_vec(payload)?);
        Ok(self)
    }

    pub fn payload_bytes(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the creation time. Defaults to now.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Builds the entry, returning None if a required field is missing.
    pub fn try_build(self) -> Option<OutboxEntry> {
        Some(OutboxEntry {
            id: self.id.unwrap_or_default(),
            tenant_id: self.tenant_id?,
            aggregate_type: self.aggregate_type?,
            aggregate_id: self.aggregate_id?,
            event_type: self.event_type?,
            payload: self.payload?,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Delivery status of an outbox row. Written only by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    #[default]
    Pending,
    Processed,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Processed => "processed",
            OutboxStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "processed" => Ok(OutboxStatus::Processed),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// An outbox entry together with the relay's bookkeeping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub entry: OutboxEntry,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    pub(crate) fn pending(entry: OutboxEntry) -> Self {
        Self {
            entry,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            processed_at: None,
        }
    }
}

/// The side of the outbox the relay process uses.
///
/// The relay polls pending rows, publishes them, and reports the outcome.
/// Publishing is at-least-once, so a row may be delivered again if the relay
/// crashes between publishing and [`OutboxSource::mark_processed`].
#[async_trait]
pub trait OutboxSource: Send + Sync {
    /// Returns up to `limit` pending entries, oldest first.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxRecord>>;

    /// Marks an entry as delivered.
    async fn mark_processed(&self, id: OutboxEntryId) -> Result<()>;

    /// Marks an entry as failed, recording the error and counting the attempt.
    async fn mark_failed(&self, id: OutboxEntryId, error: &str) -> Result<()>;
}
