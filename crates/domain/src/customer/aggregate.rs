//! Customer aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, ContactId, TenantId, UserId};
use serde::{Deserialize, Serialize};
use store::Version;

use crate::aggregate::Aggregate;

use super::events::{
    ContactAddedData, ContactRemovedData, ContactUpdatedData, CustomerConvertedData,
    CustomerCreatedData, CustomerDeletedData, CustomerRestoredData, CustomerUpdatedData,
    OwnerAssignedData, OwnerUnassignedData, PrimaryContactChangedData, StatusChangedData, TagData,
    TierChangedData,
};
use super::value_objects::{
    normalize_code, normalize_name, normalize_optional, normalize_optional_email, normalize_tag,
};
use super::{
    Contact, ContactDetails, CustomerDetails, CustomerError, CustomerEvent, CustomerStatus,
    CustomerTier, CustomerType, NewContact,
};

/// Customer aggregate root.
///
/// Owns its contacts. The code is unique per tenant and never changes after
/// creation. The version lives outside the persisted state and is set by the
/// pipeline on load and after each commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    id: AggregateId,
    tenant_id: TenantId,

    #[serde(skip)]
    version: Version,

    code: String,
    name: String,
    customer_type: CustomerType,
    status: CustomerStatus,
    tier: CustomerTier,
    email: Option<String>,
    phone: Option<String>,
    notes: Option<String>,
    tags: Vec<String>,
    owner_id: Option<UserId>,
    contacts: Vec<Contact>,

    /// Reason given for the last churn, block or reactivation.
    status_reason: Option<String>,
    converted_at: Option<DateTime<Utc>>,
    churned_at: Option<DateTime<Utc>>,

    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<UserId>,
}

impl Aggregate for Customer {
    type Event = CustomerEvent;
    type Error = CustomerError;

    fn aggregate_type() -> &'static str {
        "customer"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn business_key(&self) -> Option<String> {
        Some(self.code.clone())
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CustomerEvent::Created(data) => self.apply_created(data),
            CustomerEvent::Updated(data) => {
                self.name = data.name;
                self.email = data.email;
                self.phone = data.phone;
                self.notes = data.notes;
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::StatusChanged(data) => {
                self.status = data.to;
                self.status_reason = data.reason;
                if data.to == CustomerStatus::Churned {
                    self.churned_at = Some(data.occurred_at);
                }
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::Converted(data) => {
                self.status = CustomerStatus::Active;
                self.status_reason = None;
                self.converted_at = Some(data.occurred_at);
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::TierChanged(data) => {
                self.tier = data.to;
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::OwnerAssigned(data) => {
                self.owner_id = Some(data.owner_id);
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::OwnerUnassigned(data) => {
                self.owner_id = None;
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::TagAdded(data) => {
                if !self.tags.contains(&data.tag) {
                    self.tags.push(data.tag);
                }
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::TagRemoved(data) => {
                self.tags.retain(|t| t != &data.tag);
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::Deleted(data) => {
                self.deleted_at = Some(data.occurred_at);
                self.deleted_by = Some(data.deleted_by);
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::Restored(data) => {
                self.deleted_at = None;
                self.deleted_by = None;
                self.status = CustomerStatus::Inactive;
                self.status_reason = None;
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::ContactAdded(data) => self.apply_contact_added(data),
            CustomerEvent::ContactUpdated(data) => {
                let id = data.contact.id;
                if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == id) {
                    *contact = data.contact;
                }
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::ContactRemoved(data) => {
                self.contacts.retain(|c| c.id != data.contact_id);
                self.updated_at = data.occurred_at;
            }
            CustomerEvent::PrimaryContactChanged(data) => {
                for contact in &mut self.contacts {
                    let should_be_primary = contact.id == data.contact_id;
                    if contact.is_primary != should_be_primary {
                        contact.is_primary = should_be_primary;
                        contact.touch(data.occurred_at);
                    }
                }
                self.updated_at = data.occurred_at;
            }
        }
    }
}

// Query methods
impl Customer {
    /// Starts building a new customer owned by `tenant_id`.
    pub fn builder(tenant_id: TenantId, created_by: UserId) -> CustomerBuilder {
        CustomerBuilder::new(tenant_id, created_by)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn customer_type(&self) -> CustomerType {
        self.customer_type
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    pub fn tier(&self) -> CustomerTier {
        self.tier
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn contact(&self, contact_id: ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == contact_id)
    }

    /// Returns the primary contact. At most one contact is primary.
    pub fn primary_contact(&self) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.is_primary)
    }

    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    pub fn converted_at(&self) -> Option<DateTime<Utc>> {
        self.converted_at
    }

    pub fn churned_at(&self) -> Option<DateTime<Utc>> {
        self.churned_at
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_by(&self) -> Option<UserId> {
        self.deleted_by
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// Command methods
impl Customer {
    /// Replaces name, email, phone and notes.
    pub fn update_details(
        &self,
        details: &CustomerDetails,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        let details = details.normalized()?;

        Ok(vec![CustomerEvent::Updated(CustomerUpdatedData {
            name: details.name,
            email: details.email,
            phone: details.phone,
            notes: details.notes,
            occurred_at: Utc::now(),
        })])
    }

    /// Moves the customer to `target`, picking the matching lifecycle
    /// operation. `Churned` and `Blocked` require a reason.
    ///
    /// Leaving `Churned` or `Blocked` is not possible here; use
    /// [`Customer::reactivate`].
    pub fn change_status(
        &self,
        target: CustomerStatus,
        reason: Option<&str>,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        match target {
            CustomerStatus::Prospect => self.promote(),
            CustomerStatus::Active if self.status.can_convert() => self.convert(),
            CustomerStatus::Active => self.activate(),
            CustomerStatus::Inactive => self.deactivate(reason),
            CustomerStatus::Churned => self.churn(reason.unwrap_or_default()),
            CustomerStatus::Blocked => self.block(reason.unwrap_or_default()),
            CustomerStatus::Lead => Err(CustomerError::InvalidStatusTransition {
                from: self.status,
                action: "revert to lead",
            }),
        }
    }

    pub fn promote(&self) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.transition(CustomerStatus::Prospect, None, self.status.can_promote(), "promote")
    }

    /// Converts a lead or prospect into an active customer.
    pub fn convert(&self) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.check_transition(self.status.can_convert(), "convert")?;

        Ok(vec![CustomerEvent::Converted(CustomerConvertedData {
            from: self.status,
            occurred_at: Utc::now(),
        })])
    }

    pub fn activate(&self) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.transition(CustomerStatus::Active, None, self.status.can_activate(), "activate")
    }

    pub fn deactivate(&self, reason: Option<&str>) -> Result<Vec<CustomerEvent>, CustomerError> {
        let reason = normalize_optional(reason);
        let allowed = self.status.can_deactivate();
        self.transition(CustomerStatus::Inactive, reason, allowed, "deactivate")
    }

    pub fn churn(&self, reason: &str) -> Result<Vec<CustomerEvent>, CustomerError> {
        let allowed = self.status.can_churn();
        self.transition_with_reason(CustomerStatus::Churned, reason, allowed, "churn")
    }

    pub fn block(&self, reason: &str) -> Result<Vec<CustomerEvent>, CustomerError> {
        let allowed = self.status.can_block();
        self.transition_with_reason(CustomerStatus::Blocked, reason, allowed, "block")
    }

    /// Administrative override returning a churned or blocked customer to
    /// `Active`.
    pub fn reactivate(&self, reason: &str) -> Result<Vec<CustomerEvent>, CustomerError> {
        let allowed = self.status.can_reactivate();
        self.transition_with_reason(CustomerStatus::Active, reason, allowed, "reactivate")
    }

    pub fn assign_owner(&self, owner_id: UserId) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        if self.owner_id == Some(owner_id) {
            return Ok(vec![]);
        }

        Ok(vec![CustomerEvent::OwnerAssigned(OwnerAssignedData {
            previous_owner: self.owner_id,
            owner_id,
            occurred_at: Utc::now(),
        })])
    }

    /// Clears the owner. A customer without one is left untouched.
    pub fn unassign_owner(&self) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        let Some(previous_owner) = self.owner_id else {
            return Ok(vec![]);
        };

        Ok(vec![CustomerEvent::OwnerUnassigned(OwnerUnassignedData {
            previous_owner,
            occurred_at: Utc::now(),
        })])
    }

    pub fn change_tier(&self, tier: CustomerTier) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        if self.tier == tier {
            return Ok(vec![]);
        }

        Ok(vec![CustomerEvent::TierChanged(TierChangedData {
            from: self.tier,
            to: tier,
            occurred_at: Utc::now(),
        })])
    }

    /// Adds a tag. Tags are lowercased; adding an existing tag is a no-op.
    pub fn add_tag(&self, tag: &str) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        let tag = normalize_tag(tag)?;
        if self.tags.contains(&tag) {
            return Ok(vec![]);
        }

        Ok(vec![CustomerEvent::TagAdded(TagData {
            tag,
            occurred_at: Utc::now(),
        })])
    }

    /// Removes a tag. Removing an absent tag is a no-op.
    pub fn remove_tag(&self, tag: &str) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        let tag = normalize_tag(tag)?;
        if !self.tags.contains(&tag) {
            return Ok(vec![]);
        }

        Ok(vec![CustomerEvent::TagRemoved(TagData {
            tag,
            occurred_at: Utc::now(),
        })])
    }

    /// Adds a contact.
    ///
    /// The first contact of a customer always becomes primary. Adding a
    /// contact flagged as primary demotes the current one.
    pub fn add_contact(
        &self,
        new_contact: &NewContact,
        max_contacts: usize,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        if self.contacts.len() >= max_contacts {
            return Err(CustomerError::MaxContactsExceeded { max: max_contacts });
        }

        let details = new_contact.details.normalized()?;
        self.ensure_unique_contact_email(details.email.as_deref(), None)?;

        let now = Utc::now();
        let contact = Contact {
            id: ContactId::new(),
            first_name: details.first_name,
            last_name: details.last_name,
            email: details.email,
            phone: details.phone,
            job_title: details.job_title,
            role: details.role,
            is_primary: new_contact.is_primary || self.contacts.is_empty(),
            version: Version::first(),
            created_at: now,
            updated_at: now,
        };

        Ok(vec![CustomerEvent::ContactAdded(ContactAddedData {
            contact,
            occurred_at: now,
        })])
    }

    /// Replaces a contact's details if the caller saw its latest version.
    pub fn update_contact(
        &self,
        contact_id: ContactId,
        expected_version: Version,
        details: &ContactDetails,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        let current = self.find_contact_at(contact_id, expected_version)?;

        let details = details.normalized()?;
        self.ensure_unique_contact_email(details.email.as_deref(), Some(contact_id))?;

        let now = Utc::now();
        let mut contact = Contact {
            first_name: details.first_name,
            last_name: details.last_name,
            email: details.email,
            phone: details.phone,
            job_title: details.job_title,
            role: details.role,
            ..current.clone()
        };
        contact.touch(now);

        Ok(vec![CustomerEvent::ContactUpdated(ContactUpdatedData {
            contact,
            occurred_at: now,
        })])
    }

    /// Removes a contact. Removing the primary leaves no primary contact.
    pub fn remove_contact(
        &self,
        contact_id: ContactId,
        expected_version: Version,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        let contact = self.find_contact_at(contact_id, expected_version)?;

        Ok(vec![CustomerEvent::ContactRemoved(ContactRemovedData {
            contact_id,
            was_primary: contact.is_primary,
            occurred_at: Utc::now(),
        })])
    }

    pub fn set_primary_contact(
        &self,
        contact_id: ContactId,
        expected_version: Version,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;
        let contact = self.find_contact_at(contact_id, expected_version)?;
        let primaries = self.contacts.iter().filter(|c| c.is_primary).count();
        if contact.is_primary && primaries == 1 {
            return Ok(vec![]);
        }

        let previous = self
            .contacts
            .iter()
            .find(|c| c.is_primary && c.id != contact_id)
            .map(|c| c.id);

        Ok(vec![CustomerEvent::PrimaryContactChanged(PrimaryContactChangedData {
            previous,
            contact_id,
            occurred_at: Utc::now(),
        })])
    }

    pub fn soft_delete(&self, deleted_by: UserId) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_live()?;

        Ok(vec![CustomerEvent::Deleted(CustomerDeletedData {
            deleted_by,
            occurred_at: Utc::now(),
        })])
    }

    /// Undoes a soft delete. The customer comes back as `Inactive`.
    pub fn restore(&self, restored_by: UserId) -> Result<Vec<CustomerEvent>, CustomerError> {
        if !self.is_deleted() {
            return Err(CustomerError::NotDeleted);
        }

        Ok(vec![CustomerEvent::Restored(CustomerRestoredData {
            restored_by,
            occurred_at: Utc::now(),
        })])
    }
}

// Helpers
impl Customer {
    fn ensure_live(&self) -> Result<(), CustomerError> {
        if self.is_deleted() {
            return Err(CustomerError::Deleted);
        }
        Ok(())
    }

    fn find_contact(&self, contact_id: ContactId) -> Result<&Contact, CustomerError> {
        self.contact(contact_id)
            .ok_or(CustomerError::ContactNotFound(contact_id))
    }

    /// Finds a contact and checks it is still at `expected_version`.
    fn find_contact_at(
        &self,
        contact_id: ContactId,
        expected_version: Version,
    ) -> Result<&Contact, CustomerError> {
        let contact = self.find_contact(contact_id)?;
        if contact.version != expected_version {
            return Err(CustomerError::ContactVersionConflict {
                contact_id,
                expected: expected_version,
                actual: contact.version,
            });
        }
        Ok(contact)
    }

    fn ensure_unique_contact_email(
        &self,
        email: Option<&str>,
        except: Option<ContactId>,
    ) -> Result<(), CustomerError> {
        let Some(email) = email else {
            return Ok(());
        };
        let taken = self
            .contacts
            .iter()
            .filter(|c| Some(c.id) != except)
            .any(|c| c.email.as_deref() == Some(email));
        if taken {
            return Err(CustomerError::DuplicateContactEmail {
                email: email.to_string(),
            });
        }
        Ok(())
    }

    fn check_transition(&self, allowed: bool, action: &'static str) -> Result<(), CustomerError> {
        self.ensure_live()?;
        if !allowed {
            return Err(CustomerError::InvalidStatusTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    fn transition(
        &self,
        to: CustomerStatus,
        reason: Option<String>,
        allowed: bool,
        action: &'static str,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.check_transition(allowed, action)?;
        Ok(self.status_changed(to, reason))
    }

    /// Like [`Customer::transition`], but the target state requires a reason.
    fn transition_with_reason(
        &self,
        to: CustomerStatus,
        reason: &str,
        allowed: bool,
        action: &'static str,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.check_transition(allowed, action)?;
        let reason =
            normalize_optional(Some(reason)).ok_or(CustomerError::ReasonRequired { action })?;
        Ok(self.status_changed(to, Some(reason)))
    }

    fn status_changed(&self, to: CustomerStatus, reason: Option<String>) -> Vec<CustomerEvent> {
        vec![CustomerEvent::StatusChanged(StatusChangedData {
            from: self.status,
            to,
            reason,
            occurred_at: Utc::now(),
        })]
    }

    fn apply_created(&mut self, data: CustomerCreatedData) {
        self.id = data.customer_id;
        self.tenant_id = data.tenant_id;
        self.code = data.code;
        self.name = data.name;
        self.customer_type = data.customer_type;
        self.status = CustomerStatus::Lead;
        self.tier = data.tier;
        self.email = data.email;
        self.phone = data.phone;
        self.notes = data.notes;
        self.tags = data.tags;
        self.owner_id = data.owner_id;
        self.created_by = data.created_by;
        self.created_at = data.occurred_at;
        self.updated_at = data.occurred_at;
    }

    fn apply_contact_added(&mut self, data: ContactAddedData) {
        if data.contact.is_primary {
            for contact in self.contacts.iter_mut().filter(|c| c.is_primary) {
                contact.is_primary = false;
                contact.touch(data.occurred_at);
            }
        }
        self.contacts.push(data.contact);
        self.updated_at = data.occurred_at;
    }
}

/// Builds a new customer and the event that records its creation.
#[derive(Debug, Clone)]
pub struct CustomerBuilder {
    id: Option<AggregateId>,
    tenant_id: TenantId,
    created_by: UserId,
    name: String,
    code: Option<String>,
    customer_type: CustomerType,
    tier: CustomerTier,
    email: Option<String>,
    phone: Option<String>,
    notes: Option<String>,
    tags: Vec<String>,
    owner_id: Option<UserId>,
}

impl CustomerBuilder {
    fn new(tenant_id: TenantId, created_by: UserId) -> Self {
        Self {
            id: None,
            tenant_id,
            created_by,
            name: String::new(),
            code: None,
            customer_type: CustomerType::default(),
            tier: CustomerTier::default(),
            email: None,
            phone: None,
            notes: None,
            tags: Vec::new(),
            owner_id: None,
        }
    }

    /// Uses a caller-chosen id instead of a fresh one.
    pub fn id(mut self, id: AggregateId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the business code. A code is generated when none is given.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn customer_type(mut self, customer_type: CustomerType) -> Self {
        self.customer_type = customer_type;
        self
    }

    pub fn tier(mut self, tier: CustomerTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Validates the input and returns the new customer with its
    /// `customer.created` event already applied.
    pub fn build(self) -> Result<(Customer, Vec<CustomerEvent>), CustomerError> {
        let name = normalize_name(&self.name)?;
        let code = normalize_code(self.code.as_deref(), self.customer_type)?;
        let email = normalize_optional_email(self.email.as_deref())?;

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for raw in &self.tags {
            let tag = normalize_tag(raw)?;
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let event = CustomerEvent::Created(CustomerCreatedData {
            customer_id: self.id.unwrap_or_default(),
            tenant_id: self.tenant_id,
            code,
            name,
            customer_type: self.customer_type,
            tier: self.tier,
            email,
            phone: normalize_optional(self.phone.as_deref()),
            notes: normalize_optional(self.notes.as_deref()),
            tags,
            owner_id: self.owner_id,
            created_by: self.created_by,
            occurred_at: Utc::now(),
        });

        let mut customer = Customer::default();
        customer.apply(event.clone());
        Ok((customer, vec![event]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;

    fn customer() -> Customer {
        let (customer, _) = Customer::builder(TenantId::new(), UserId::new())
            .name("Acme Corp")
            .code("acme")
            .build()
            .unwrap();
        customer
    }

    fn customer_in(status: CustomerStatus) -> Customer {
        let mut customer = customer();
        customer.status = status;
        customer
    }

    fn run(customer: &mut Customer, events: Result<Vec<CustomerEvent>, CustomerError>) {
        customer.apply_events(events.unwrap());
    }

    fn with_contacts(emails: &[&str]) -> Customer {
        let mut customer = customer();
        for email in emails {
            let new = NewContact::new(ContactDetails::new("Contact").with_email(*email));
            let events = customer.add_contact(&new, 100);
            run(&mut customer, events);
        }
        customer
    }

    #[test]
    fn test_build_customer() {
        let tenant = TenantId::new();
        let (customer, events) = Customer::builder(tenant, UserId::new())
            .name("  Acme Corp ")
            .code("acme-1")
            .email("Info@Acme.com")
            .tags(["VIP", "vip", "Enterprise"])
            .build()
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "customer.created");
        assert_eq!(customer.tenant_id(), tenant);
        assert_eq!(customer.name(), "Acme Corp");
        assert_eq!(customer.code(), "ACME-1");
        assert_eq!(customer.email(), Some("info@acme.com"));
        assert_eq!(customer.tags(), ["vip", "enterprise"]);
        assert_eq!(customer.status(), CustomerStatus::Lead);
        assert_eq!(customer.business_key().as_deref(), Some("ACME-1"));
        assert!(customer.contacts().is_empty());
    }

    #[test]
    fn test_build_requires_name() {
        let result = Customer::builder(TenantId::new(), UserId::new()).build();
        assert!(matches!(result, Err(CustomerError::NameRequired)));
    }

    #[test]
    fn test_build_rejects_bad_email() {
        let result = Customer::builder(TenantId::new(), UserId::new())
            .name("Acme")
            .email("not-an-email")
            .build();
        assert!(matches!(result, Err(CustomerError::InvalidEmail(_))));
    }

    #[test]
    fn test_update_details() {
        let mut customer = customer();
        let details = CustomerDetails {
            name: "Acme Inc".into(),
            email: Some("hello@acme.io".into()),
            ..Default::default()
        };

        let events = customer.update_details(&details).unwrap();
        assert_eq!(events[0].event_type(), "customer.updated");
        customer.apply_events(events);
        assert_eq!(customer.name(), "Acme Inc");
        assert_eq!(customer.email(), Some("hello@acme.io"));
    }

    #[test]
    fn test_update_details_validates() {
        let customer = customer();
        let result = customer.update_details(&CustomerDetails::new(""));
        assert!(matches!(result, Err(CustomerError::NameRequired)));
    }

    #[test]
    fn test_full_status_lifecycle() {
        let mut customer = customer();

        let events = customer.promote();
        run(&mut customer, events);
        assert_eq!(customer.status(), CustomerStatus::Prospect);

        let events = customer.convert();
        run(&mut customer, events);
        assert_eq!(customer.status(), CustomerStatus::Active);
        assert!(customer.converted_at().is_some());

        let events = customer.deactivate(None);
        run(&mut customer, events);
        assert_eq!(customer.status(), CustomerStatus::Inactive);

        let events = customer.activate();
        run(&mut customer, events);
        assert_eq!(customer.status(), CustomerStatus::Active);

        let events = customer.churn("budget cuts");
        run(&mut customer, events);
        assert_eq!(customer.status(), CustomerStatus::Churned);
        assert_eq!(customer.status_reason(), Some("budget cuts"));
        assert!(customer.churned_at().is_some());

        let events = customer.reactivate("won back");
        run(&mut customer, events);
        assert_eq!(customer.status(), CustomerStatus::Active);
    }

    #[test]
    fn test_blocked_cannot_activate() {
        let customer = customer_in(CustomerStatus::Blocked);

        let result = customer.change_status(CustomerStatus::Active, None);
        assert!(matches!(
            result,
            Err(CustomerError::InvalidStatusTransition {
                from: CustomerStatus::Blocked,
                action: "activate"
            })
        ));
    }

    #[test]
    fn test_reactivate_only_from_terminal_states() {
        let customer = customer_in(CustomerStatus::Active);
        assert!(matches!(
            customer.reactivate("why not"),
            Err(CustomerError::InvalidStatusTransition { .. })
        ));

        let blocked = customer_in(CustomerStatus::Blocked);
        assert!(blocked.reactivate("appeal accepted").is_ok());
    }

    #[test]
    fn test_churn_and_block_require_reason() {
        let customer = customer_in(CustomerStatus::Active);
        assert!(matches!(
            customer.churn("  "),
            Err(CustomerError::ReasonRequired { action: "churn" })
        ));
        assert!(matches!(
            customer.change_status(CustomerStatus::Blocked, None),
            Err(CustomerError::ReasonRequired { action: "block" })
        ));
    }

    #[test]
    fn test_change_status_dispatch() {
        let lead = customer();
        let events = lead.change_status(CustomerStatus::Active, None).unwrap();
        assert_eq!(events[0].event_type(), "customer.converted");

        let events = lead.change_status(CustomerStatus::Prospect, None).unwrap();
        assert_eq!(events[0].event_type(), "customer.status_changed");

        assert!(matches!(
            lead.change_status(CustomerStatus::Lead, None),
            Err(CustomerError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_tier_and_owner() {
        let mut customer = customer();
        let owner = UserId::new();

        let events = customer.assign_owner(owner);
        run(&mut customer, events);
        assert_eq!(customer.owner_id(), Some(owner));
        assert!(customer.assign_owner(owner).unwrap().is_empty());

        let events = customer.change_tier(CustomerTier::Gold);
        run(&mut customer, events);
        assert_eq!(customer.tier(), CustomerTier::Gold);
        assert!(customer.change_tier(CustomerTier::Gold).unwrap().is_empty());
    }

    #[test]
    fn test_unassign_owner() {
        let mut customer = customer();
        assert!(customer.unassign_owner().unwrap().is_empty());

        let owner = UserId::new();
        let events = customer.assign_owner(owner);
        run(&mut customer, events);

        let events = customer.unassign_owner().unwrap();
        assert!(matches!(
            &events[..],
            [CustomerEvent::OwnerUnassigned(data)] if data.previous_owner == owner
        ));
        run(&mut customer, Ok(events));
        assert_eq!(customer.owner_id(), None);
        assert!(customer.unassign_owner().unwrap().is_empty());
    }

    #[test]
    fn test_tags_are_idempotent() {
        let mut customer = customer();

        let events = customer.add_tag(" Priority ");
        run(&mut customer, events);
        assert_eq!(customer.tags(), ["priority"]);
        assert!(customer.add_tag("PRIORITY").unwrap().is_empty());

        let events = customer.remove_tag("priority");
        run(&mut customer, events);
        assert!(customer.tags().is_empty());
        assert!(customer.remove_tag("priority").unwrap().is_empty());
    }

    #[test]
    fn test_first_contact_becomes_primary() {
        let customer = with_contacts(&["a@acme.com", "b@acme.com"]);
        let contacts = customer.contacts();

        assert!(contacts[0].is_primary);
        assert!(!contacts[1].is_primary);
        assert_eq!(customer.primary_contact().map(|c| c.id), Some(contacts[0].id));
    }

    #[test]
    fn test_adding_primary_demotes_previous() {
        let mut customer = with_contacts(&["a@acme.com"]);
        let first = customer.contacts()[0].id;

        let new = NewContact::new(ContactDetails::new("Bea").with_email("bea@acme.com")).primary();
        let events = customer.add_contact(&new, 100);
        run(&mut customer, events);

        let primaries: Vec<_> = customer.contacts().iter().filter(|c| c.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_ne!(primaries[0].id, first);
        assert_eq!(customer.contact(first).unwrap().version, Version::new(2));
    }

    #[test]
    fn test_max_contacts() {
        let customer = with_contacts(&["a@acme.com", "b@acme.com"]);
        let new = NewContact::new(ContactDetails::new("Cy"));

        let result = customer.add_contact(&new, 2);
        assert!(matches!(result, Err(CustomerError::MaxContactsExceeded { max: 2 })));
    }

    #[test]
    fn test_duplicate_contact_email() {
        let customer = with_contacts(&["a@acme.com"]);
        let new = NewContact::new(ContactDetails::new("Al").with_email("A@ACME.com"));

        let result = customer.add_contact(&new, 100);
        assert!(matches!(result, Err(CustomerError::DuplicateContactEmail { .. })));
    }

    #[test]
    fn test_update_contact_checks_contact_version() {
        let mut customer = with_contacts(&["a@acme.com"]);
        let id = customer.contacts()[0].id;
        let details = ContactDetails::new("Ada").with_email("ada@acme.com");

        let events = customer.update_contact(id, Version::first(), &details);
        run(&mut customer, events);
        let contact = customer.contact(id).unwrap();
        assert_eq!(contact.first_name, "Ada");
        assert_eq!(contact.version, Version::new(2));
        assert!(contact.is_primary);

        let stale = customer.update_contact(id, Version::first(), &details);
        assert!(matches!(
            stale,
            Err(CustomerError::ContactVersionConflict { actual, .. }) if actual == Version::new(2)
        ));
    }

    #[test]
    fn test_update_contact_rejects_email_of_sibling() {
        let customer = with_contacts(&["a@acme.com", "b@acme.com"]);
        let second = customer.contacts()[1].clone();
        let details = ContactDetails::new("B").with_email("a@acme.com");

        let result = customer.update_contact(second.id, second.version, &details);
        assert!(matches!(result, Err(CustomerError::DuplicateContactEmail { .. })));
    }

    #[test]
    fn test_removing_primary_leaves_no_primary() {
        let mut customer = with_contacts(&["a@acme.com", "b@acme.com"]);
        let primary = customer.primary_contact().unwrap();

        let events = customer.remove_contact(primary.id, primary.version);
        run(&mut customer, events);

        assert_eq!(customer.contacts().len(), 1);
        assert!(customer.primary_contact().is_none());
    }

    #[test]
    fn test_set_primary_contact() {
        let mut customer = with_contacts(&["a@acme.com", "b@acme.com"]);
        let first = customer.contacts()[0].id;
        let second = customer.contacts()[1].id;

        let events = customer.set_primary_contact(second, Version::first());
        run(&mut customer, events);

        let primary = customer.primary_contact().unwrap();
        assert_eq!(primary.id, second);
        assert_eq!(primary.version, Version::new(2));
        assert!(!customer.contact(first).unwrap().is_primary);

        let again = customer.set_primary_contact(second, Version::new(2));
        assert!(again.unwrap().is_empty());
    }

    #[test]
    fn test_stale_contact_version_blocks_remove_and_set_primary() {
        let customer = with_contacts(&["a@acme.com", "b@acme.com"]);
        let second = customer.contacts()[1].clone();
        let stale = second.version.next();

        assert!(matches!(
            customer.remove_contact(second.id, stale),
            Err(CustomerError::ContactVersionConflict { contact_id, actual, .. })
                if contact_id == second.id && actual == second.version
        ));
        assert!(matches!(
            customer.set_primary_contact(second.id, stale),
            Err(CustomerError::ContactVersionConflict { .. })
        ));
    }

    #[test]
    fn test_unknown_contact() {
        let customer = customer();
        let missing = ContactId::new();
        assert!(matches!(
            customer.remove_contact(missing, Version::first()),
            Err(CustomerError::ContactNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_delete_and_restore() {
        let mut customer = customer_in(CustomerStatus::Active);
        let admin = UserId::new();

        let events = customer.soft_delete(admin);
        run(&mut customer, events);
        assert!(customer.is_deleted());
        assert_eq!(customer.deleted_by(), Some(admin));
        assert!(matches!(customer.add_tag("x"), Err(CustomerError::Deleted)));
        assert!(matches!(customer.soft_delete(admin), Err(CustomerError::Deleted)));

        let events = customer.restore(admin);
        run(&mut customer, events);
        assert!(!customer.is_deleted());
        assert_eq!(customer.status(), CustomerStatus::Inactive);
        assert!(matches!(customer.restore(admin), Err(CustomerError::NotDeleted)));
    }

    #[test]
    fn test_version_not_serialized() {
        let mut customer = customer();
        customer.set_version(Version::new(7));

        let json = serde_json::to_value(&customer).unwrap();
        assert!(json.get("version").is_none());

        let back: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(back.version(), Version::default());
        assert_eq!(back.code(), customer.code());
    }
}
