//! Customer commands.
//!
//! Registration carries no id or version; every other command targets an
//! existing customer at the version the caller last read.

use common::{AggregateId, ContactId, UserId};
use store::Version;

use crate::command::Command;

use super::{
    ContactDetails, Customer, CustomerDetails, CustomerStatus, CustomerTier, CustomerType,
    NewContact,
};

/// Command to register a new customer in the caller's tenant.
#[derive(Debug, Clone, Default)]
pub struct RegisterCustomer {
    pub name: String,

    /// Business code. Generated from the customer type when absent.
    pub code: Option<String>,

    pub customer_type: CustomerType,
    pub tier: CustomerTier,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: Option<UserId>,
}

impl RegisterCustomer {
    pub fn new(name: impl Into<String>, customer_type: CustomerType) -> Self {
        Self {
            name: name.into(),
            customer_type,
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

macro_rules! customer_command {
    ($name:ident) => {
        impl Command for $name {
            type Aggregate = Customer;

            fn aggregate_id(&self) -> AggregateId {
                self.customer_id
            }

            fn expected_version(&self) -> Version {
                self.expected_version
            }
        }
    };
}

/// Command to replace a customer's name and contact details.
#[derive(Debug, Clone)]
pub struct UpdateCustomer {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub details: CustomerDetails,
}

impl UpdateCustomer {
    pub fn new(
        customer_id: AggregateId,
        expected_version: Version,
        details: CustomerDetails,
    ) -> Self {
        Self {
            customer_id,
            expected_version,
            details,
        }
    }
}

customer_command!(UpdateCustomer);

/// Command to move a customer to another lifecycle status.
#[derive(Debug, Clone)]
pub struct ChangeCustomerStatus {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub status: CustomerStatus,

    /// Required when moving to `Churned` or `Blocked`.
    pub reason: Option<String>,
}

impl ChangeCustomerStatus {
    pub fn new(
        customer_id: AggregateId,
        expected_version: Version,
        status: CustomerStatus,
    ) -> Self {
        Self {
            customer_id,
            expected_version,
            status,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

customer_command!(ChangeCustomerStatus);

/// Command to bring a churned or blocked customer back to `Active`.
#[derive(Debug, Clone)]
pub struct ReactivateCustomer {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub reason: String,
}

customer_command!(ReactivateCustomer);

#[derive(Debug, Clone)]
pub struct AssignOwner {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub owner_id: UserId,
}

customer_command!(AssignOwner);

#[derive(Debug, Clone)]
pub struct UnassignOwner {
    pub customer_id: AggregateId,
    pub expected_version: Version,
}

customer_command!(UnassignOwner);

#[derive(Debug, Clone)]
pub struct ChangeTier {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub tier: CustomerTier,
}

customer_command!(ChangeTier);

#[derive(Debug, Clone)]
pub struct AddTag {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub tag: String,
}

customer_command!(AddTag);

#[derive(Debug, Clone)]
pub struct RemoveTag {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub tag: String,
}

customer_command!(RemoveTag);

/// Command to add a contact to a customer.
#[derive(Debug, Clone)]
pub struct AddContact {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub contact: NewContact,
}

impl AddContact {
    pub fn new(customer_id: AggregateId, expected_version: Version, contact: NewContact) -> Self {
        Self {
            customer_id,
            expected_version,
            contact,
        }
    }
}

customer_command!(AddContact);

/// Command to edit one contact.
///
/// Checks both the customer version and the contact's own version.
#[derive(Debug, Clone)]
pub struct UpdateContact {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub contact_id: ContactId,
    pub expected_contact_version: Version,
    pub details: ContactDetails,
}

customer_command!(UpdateContact);

#[derive(Debug, Clone)]
pub struct RemoveContact {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub contact_id: ContactId,
    pub expected_contact_version: Version,
}

customer_command!(RemoveContact);

#[derive(Debug, Clone)]
pub struct SetPrimaryContact {
    pub customer_id: AggregateId,
    pub expected_version: Version,
    pub contact_id: ContactId,
    pub expected_contact_version: Version,
}

customer_command!(SetPrimaryContact);

/// Command to soft-delete a customer.
#[derive(Debug, Clone)]
pub struct DeleteCustomer {
    pub customer_id: AggregateId,
    pub expected_version: Version,
}

impl DeleteCustomer {
    pub fn new(customer_id: AggregateId, expected_version: Version) -> Self {
        Self {
            customer_id,
            expected_version,
        }
    }
}

customer_command!(DeleteCustomer);

#[derive(Debug, Clone)]
pub struct RestoreCustomer {
    pub customer_id: AggregateId,
    pub expected_version: Version,
}

customer_command!(RestoreCustomer);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_targets() {
        let id = AggregateId::new();
        let cmd = DeleteCustomer::new(id, Version::new(3));

        assert_eq!(cmd.aggregate_id(), id);
        assert_eq!(cmd.expected_version(), Version::new(3));
    }

    #[test]
    fn test_register_defaults() {
        let cmd = RegisterCustomer::new("Acme", CustomerType::Partner).with_code("ac-1");

        assert_eq!(cmd.code.as_deref(), Some("ac-1"));
        assert_eq!(cmd.tier, CustomerTier::Standard);
        assert!(cmd.tags.is_empty());
    }
}
