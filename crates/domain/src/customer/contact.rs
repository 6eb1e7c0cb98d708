//! Contacts owned by a customer.

use chrono::{DateTime, Utc};
use common::ContactId;
use serde::{Deserialize, Serialize};
use store::Version;

use super::CustomerError;
use super::value_objects::{normalize_optional, normalize_optional_email};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    DecisionMaker,
    Technical,
    Billing,
    #[default]
    Other,
}

/// A person associated with a customer.
///
/// Each contact carries its own version so that edits to one contact can be
/// checked independently of the rest of the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub role: ContactRole,
    pub is_primary: bool,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = at;
    }
}

/// Editable contact fields. Every field is replaced on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub role: ContactRole,
}

impl ContactDetails {
    pub fn new(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub(crate) fn normalized(&self) -> Result<Self, CustomerError> {
        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            return Err(CustomerError::ContactNameRequired);
        }
        Ok(Self {
            first_name: first_name.to_string(),
            last_name: normalize_optional(self.last_name.as_deref()),
            email: normalize_optional_email(self.email.as_deref())?,
            phone: normalize_optional(self.phone.as_deref()),
            job_title: normalize_optional(self.job_title.as_deref()),
            role: self.role,
        })
    }
}

/// Input for adding a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NewContact {
    pub details: ContactDetails,
    pub is_primary: bool,
}

impl NewContact {
    pub fn new(details: ContactDetails) -> Self {
        Self {
            details,
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_require_first_name() {
        let result = ContactDetails::new("  ").normalized();
        assert!(matches!(result, Err(CustomerError::ContactNameRequired)));
    }

    #[test]
    fn test_details_normalize_email_and_blanks() {
        let details = ContactDetails {
            first_name: " Ada ".into(),
            last_name: Some(" ".into()),
            email: Some("ADA@Example.com".into()),
            ..Default::default()
        };
        let normalized = details.normalized().unwrap();
        assert_eq!(normalized.first_name, "Ada");
        assert_eq!(normalized.last_name, None);
        assert_eq!(normalized.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_full_name() {
        let now = Utc::now();
        let mut contact = Contact {
            id: ContactId::new(),
            first_name: "Ada".into(),
            last_name: Some("Lovelace".into()),
            email: None,
            phone: None,
            job_title: None,
            role: ContactRole::Technical,
            is_primary: false,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(contact.full_name(), "Ada Lovelace");

        contact.touch(now);
        assert_eq!(contact.version, Version::new(2));
    }
}
