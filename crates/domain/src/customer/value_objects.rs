//! Value objects and normalization rules for customer data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CustomerError;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_CODE_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 254;

/// Kind of customer, which also drives the generated code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    #[default]
    Company,
    Partner,
    Reseller,
    Individual,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Company => "company",
            CustomerType::Partner => "partner",
            CustomerType::Reseller => "reseller",
            CustomerType::Individual => "individual",
        }
    }

    fn code_prefix(&self) -> &'static str {
        match self {
            CustomerType::Company => "CO",
            CustomerType::Partner => "PA",
            CustomerType::Reseller => "RS",
            CustomerType::Individual => "IN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    #[default]
    Standard,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Enterprise,
}

impl CustomerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTier::Standard => "standard",
            CustomerTier::Bronze => "bronze",
            CustomerTier::Silver => "silver",
            CustomerTier::Gold => "gold",
            CustomerTier::Platinum => "platinum",
            CustomerTier::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Editable top-level customer fields. Every field is replaced on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl CustomerDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns a copy with normalized fields, or the first rule violated.
    pub(crate) fn normalized(&self) -> Result<Self, CustomerError> {
        Ok(Self {
            name: normalize_name(&self.name)?,
            email: normalize_optional_email(self.email.as_deref())?,
            phone: normalize_optional(self.phone.as_deref()),
            notes: normalize_optional(self.notes.as_deref()),
        })
    }
}

pub(crate) fn normalize_name(raw: &str) -> Result<String, CustomerError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CustomerError::NameRequired);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CustomerError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

/// Uppercases a caller-supplied code or generates one from the customer type.
pub(crate) fn normalize_code(
    raw: Option<&str>,
    customer_type: CustomerType,
) -> Result<String, CustomerError> {
    let Some(code) = raw.map(str::trim).filter(|code| !code.is_empty()) else {
        return Ok(generate_code(customer_type));
    };

    // Uppercasing can lengthen a code ("ß" becomes "SS")
    let code = code.to_uppercase();
    if code.chars().count() > MAX_CODE_LEN {
        return Err(CustomerError::CodeTooLong { max: MAX_CODE_LEN });
    }
    Ok(code)
}

fn generate_code(customer_type: CustomerType) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("{}-{}", customer_type.code_prefix(), suffix.to_uppercase())
}

/// Trims and lowercases an email, rejecting obviously malformed addresses.
pub(crate) fn normalize_email(raw: &str) -> Result<String, CustomerError> {
    let email = raw.trim().to_lowercase();
    let invalid = || CustomerError::InvalidEmail(raw.trim().to_string());

    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels_ok = domain.split('.').all(|label| !label.is_empty());
    if !domain.contains('.') || !labels_ok {
        return Err(invalid());
    }
    Ok(email)
}

pub(crate) fn normalize_optional_email(
    raw: Option<&str>,
) -> Result<Option<String>, CustomerError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(email) => normalize_email(email).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn normalize_tag(raw: &str) -> Result<String, CustomerError> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        return Err(CustomerError::InvalidTag);
    }
    Ok(tag)
}
