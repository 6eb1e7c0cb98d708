//! Customer status state machine.

use serde::{Deserialize, Serialize};

/// The lifecycle status of a customer.
///
/// Ordinary transitions:
/// ```text
/// Lead ──► Prospect ──┐
///   └─────────────────┴─► Active ◄──► Inactive
///                           │            │
///                           └─────┬──────┘
///                                 ▼
///                         Churned / Blocked
/// ```
///
/// `Churned` and `Blocked` only leave through the explicit reactivation
/// override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    #[default]
    Lead,
    Prospect,
    Active,
    Inactive,
    Churned,
    Blocked,
}

impl CustomerStatus {
    pub fn can_promote(&self) -> bool {
        matches!(self, CustomerStatus::Lead)
    }

    pub fn can_convert(&self) -> bool {
        matches!(self, CustomerStatus::Lead | CustomerStatus::Prospect)
    }

    pub fn can_activate(&self) -> bool {
        matches!(self, CustomerStatus::Inactive)
    }

    pub fn can_deactivate(&self) -> bool {
        matches!(self, CustomerStatus::Active)
    }

    pub fn can_churn(&self) -> bool {
        matches!(self, CustomerStatus::Active | CustomerStatus::Inactive)
    }

    pub fn can_block(&self) -> bool {
        matches!(self, CustomerStatus::Active | CustomerStatus::Inactive)
    }

    /// Only the administrative override may leave these states.
    pub fn can_reactivate(&self) -> bool {
        matches!(self, CustomerStatus::Churned | CustomerStatus::Blocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Lead => "lead",
            CustomerStatus::Prospect => "prospect",
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
            CustomerStatus::Churned => "churned",
            CustomerStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
