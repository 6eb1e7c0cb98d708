//! Domain error types.

use common::AggregateId;
use store::{StoreError, Version};
use thiserror::Error;

use crate::customer::CustomerError;

/// Errors returned by the mutation pipeline and the use cases built on it.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The aggregate or one of its child entities does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller's tenant does not own the aggregate.
    ///
    /// Carries nothing from the aggregate, so it cannot leak another
    /// tenant's data.
    #[error("Tenant mismatch")]
    TenantMismatch,

    /// The caller's expected version is stale. Raised identically by the
    /// pre-check and by the store's conditional write.
    #[error(
        "Version conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The customer aggregate rejected the change.
    #[error("Customer error: {0}")]
    Validation(#[from] CustomerError),

    /// An identity or business key is already taken.
    #[error("Already exists: {key}")]
    AlreadyExists { key: String },

    /// Begin, write, commit or rollback failed in the store.
    #[error("Transaction error: {0}")]
    Transaction(StoreError),

    /// The caller's deadline expired before the change was durable.
    /// Nothing was committed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The deadline expired while the commit was in flight. The change may
    /// or may not be durable; reload and re-check the version before retrying.
    #[error("Commit outcome unknown for aggregate {aggregate_id}")]
    CommitOutcomeUnknown { aggregate_id: AggregateId },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal invariant of the pipeline was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`DomainError`] for callers and boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    TenantMismatch,
    VersionConflict,
    Validation,
    AlreadyExists,
    Transaction,
    DeadlineExceeded,
    CommitOutcomeUnknown,
    Internal,
}

impl ErrorKind {
    /// The kind a caller outside the tenant boundary may see.
    ///
    /// A tenant mismatch is reported as not found so that the existence of
    /// another tenant's aggregate is never revealed.
    pub fn public(self) -> Self {
        match self {
            ErrorKind::TenantMismatch => ErrorKind::NotFound,
            kind => kind,
        }
    }
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::TenantMismatch => ErrorKind::TenantMismatch,
            DomainError::VersionConflict { .. } => ErrorKind::VersionConflict,
            DomainError::Validation(CustomerError::ContactVersionConflict { .. }) => {
                ErrorKind::VersionConflict
            }
            DomainError::Validation(CustomerError::ContactNotFound(_)) => ErrorKind::NotFound,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            DomainError::Transaction(_) => ErrorKind::Transaction,
            DomainError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            DomainError::CommitOutcomeUnknown { .. } => ErrorKind::CommitOutcomeUnknown,
            DomainError::Serialization(_) | DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for errors caused by a concurrent writer.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::VersionConflict
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict {
                aggregate_id,
                expected,
                actual,
            } => DomainError::VersionConflict {
                aggregate_id,
                expected,
                actual,
            },
            StoreError::NotFound(id) => DomainError::NotFound {
                entity: "aggregate",
                id: id.to_string(),
            },
            StoreError::DuplicateId(id) => DomainError::AlreadyExists {
                key: id.to_string(),
            },
            StoreError::DuplicateKey { business_key, .. } => {
                DomainError::AlreadyExists { key: business_key }
            }
            StoreError::Serialization(e) => DomainError::Serialization(e),
            other => DomainError::Transaction(other),
        }
    }
}
