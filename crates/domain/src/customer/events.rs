//! Customer domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, ContactId, TenantId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Contact, CustomerStatus, CustomerTier, CustomerType};

/// Events that can occur on a customer aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustomerEvent {
    /// Customer was registered.
    Created(CustomerCreatedData),

    /// Name or contact details were edited.
    Updated(CustomerUpdatedData),

    /// Status moved along the lifecycle.
    StatusChanged(StatusChangedData),

    /// A lead or prospect became an active customer.
    Converted(CustomerConvertedData),

    TierChanged(TierChangedData),

    OwnerAssigned(OwnerAssignedData),

    OwnerUnassigned(OwnerUnassignedData),

    TagAdded(TagData),

    TagRemoved(TagData),

    /// Customer was soft-deleted.
    Deleted(CustomerDeletedData),

    /// A soft-deleted customer was brought back.
    Restored(CustomerRestoredData),

    ContactAdded(ContactAddedData),

    ContactUpdated(ContactUpdatedData),

    ContactRemoved(ContactRemovedData),

    PrimaryContactChanged(PrimaryContactChangedData),
}

impl DomainEvent for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::Created(_) => "customer.created",
            CustomerEvent::Updated(_) => "customer.updated",
            CustomerEvent::StatusChanged(_) => "customer.status_changed",
            CustomerEvent::Converted(_) => "customer.converted",
            CustomerEvent::TierChanged(_) => "customer.tier_changed",
            CustomerEvent::OwnerAssigned(_) => "customer.owner_assigned",
            CustomerEvent::OwnerUnassigned(_) => "customer.owner_unassigned",
            CustomerEvent::TagAdded(_) => "customer.tag_added",
            CustomerEvent::TagRemoved(_) => "customer.tag_removed",
            CustomerEvent::Deleted(_) => "customer.deleted",
            CustomerEvent::Restored(_) => "customer.restored",
            CustomerEvent::ContactAdded(_) => "customer.contact.added",
            CustomerEvent::ContactUpdated(_) => "customer.contact.updated",
            CustomerEvent::ContactRemoved(_) => "customer.contact.removed",
            CustomerEvent::PrimaryContactChanged(_) => "customer.contact.primary_changed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCreatedData {
    pub customer_id: AggregateId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub customer_type: CustomerType,
    pub tier: CustomerTier,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: Option<UserId>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the full set of editable fields after the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerUpdatedData {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: CustomerStatus,
    pub to: CustomerStatus,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerConvertedData {
    pub from: CustomerStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierChangedData {
    pub from: CustomerTier,
    pub to: CustomerTier,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerAssignedData {
    pub previous_owner: Option<UserId>,
    pub owner_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerUnassignedData {
    pub previous_owner: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagData {
    pub tag: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDeletedData {
    pub deleted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRestoredData {
    pub restored_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the contact as it will be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactAddedData {
    pub contact: Contact,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the contact after the edit, including its bumped version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactUpdatedData {
    pub contact: Contact,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRemovedData {
    pub contact_id: ContactId,
    pub was_primary: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryContactChangedData {
    pub previous: Option<ContactId>,
    pub contact_id: ContactId,
    pub occurred_at: DateTime<Utc>,
}
