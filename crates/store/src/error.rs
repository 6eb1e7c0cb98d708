use thiserror::Error;

use crate::{AggregateId, OutboxEntryId, Version};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version did not match the version the writer expected.
    /// Nothing was written.
    #[error(
        "Version conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// No record exists with the given id.
    #[error("Aggregate not found: {0}")]
    NotFound(AggregateId),

    /// A record with the same id already exists.
    #[error("Aggregate already exists: {0}")]
    DuplicateId(AggregateId),

    /// Another record of the same type in the same tenant holds this business key.
    #[error("Duplicate {aggregate_type} key: {business_key}")]
    DuplicateKey {
        aggregate_type: String,
        business_key: String,
    },

    /// The transaction was already committed or rolled back.
    #[error("Transaction is no longer active")]
    TransactionClosed,

    /// The referenced outbox entry does not exist.
    #[error("Outbox entry not found: {0}")]
    OutboxEntryNotFound(OutboxEntryId),

    /// An outbox row carried a status this crate does not know.
    #[error("Unknown outbox status: {0}")]
    InvalidStatus(String),

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
