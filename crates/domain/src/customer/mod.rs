//! Customer aggregate and related types.

mod aggregate;
mod commands;
mod contact;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::{Customer, CustomerBuilder};
pub use commands::*;
pub use contact::{Contact, ContactDetails, ContactRole, NewContact};
pub use events::{
    ContactAddedData, ContactRemovedData, ContactUpdatedData, CustomerConvertedData,
    CustomerCreatedData, CustomerDeletedData, CustomerEvent, CustomerRestoredData,
    CustomerUpdatedData, OwnerAssignedData, OwnerUnassignedData, PrimaryContactChangedData,
    StatusChangedData, TagData, TierChangedData,
};
pub use service::CustomerService;
pub use status::CustomerStatus;
pub use value_objects::{CustomerDetails, CustomerTier, CustomerType, MAX_CODE_LEN, MAX_NAME_LEN};

use common::ContactId;
use store::Version;
use thiserror::Error;

/// Errors that can occur during customer operations.
///
/// Each variant identifies the invariant that was violated; [`CustomerError::code`]
/// gives a stable machine-readable form.
#[derive(Debug, Error)]
pub enum CustomerError {
    /// The requested status change is not allowed from the current status.
    #[error("Invalid status transition: cannot {action} from {from} status")]
    InvalidStatusTransition {
        from: CustomerStatus,
        action: &'static str,
    },

    #[error("A reason is required to {action}")]
    ReasonRequired { action: &'static str },

    #[error("Customer name is required")]
    NameRequired,

    #[error("Customer name exceeds {max} characters")]
    NameTooLong { max: usize },

    #[error("Customer code exceeds {max} characters")]
    CodeTooLong { max: usize },

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Tag must not be empty")]
    InvalidTag,

    #[error("Contact first name is required")]
    ContactNameRequired,

    /// Adding another contact would exceed the configured limit.
    #[error("Maximum number of contacts ({max}) exceeded")]
    MaxContactsExceeded { max: usize },

    #[error("Contact email already exists for this customer: {email}")]
    DuplicateContactEmail { email: String },

    #[error("Contact not found: {0}")]
    ContactNotFound(ContactId),

    /// The contact changed since the caller last read it.
    #[error("Contact {contact_id} version conflict: expected {expected}, found {actual}")]
    ContactVersionConflict {
        contact_id: ContactId,
        expected: Version,
        actual: Version,
    },

    #[error("Customer is deleted")]
    Deleted,

    #[error("Customer is not deleted")]
    NotDeleted,
}

impl CustomerError {
    pub fn code(&self) -> &'static str {
        match self {
            CustomerError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            CustomerError::ReasonRequired { .. } => "REASON_REQUIRED",
            CustomerError::NameRequired
            | CustomerError::NameTooLong { .. }
            | CustomerError::CodeTooLong { .. } => "INVALID_CUSTOMER_DATA",
            CustomerError::InvalidEmail(_) => "INVALID_EMAIL",
            CustomerError::InvalidTag => "INVALID_TAG",
            CustomerError::ContactNameRequired => "INVALID_CONTACT_DATA",
            CustomerError::MaxContactsExceeded { .. } => "MAX_CONTACTS_EXCEEDED",
            CustomerError::DuplicateContactEmail { .. } => "DUPLICATE_EMAIL",
            CustomerError::ContactNotFound(_) => "CONTACT_NOT_FOUND",
            CustomerError::ContactVersionConflict { .. } => "VERSION_MISMATCH",
            CustomerError::Deleted => "CUSTOMER_DELETED",
            CustomerError::NotDeleted => "CUSTOMER_NOT_DELETED",
        }
    }
}
