use async_trait::async_trait;

use crate::{AggregateId, AggregateRecord, OutboxEntry, Result, Version};

/// Entry point into a store: opens transactions and serves reads.
///
/// Implementations must be cheap to share across concurrent use-case
/// invocations. No in-process locking of aggregates is implied: concurrent
/// writers are arbitrated only by the version check in
/// [`Transaction::update_record`].
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Transaction: Transaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Loads a record by id, including soft-deleted records.
    ///
    /// Does not filter by tenant. Callers apply the tenant check themselves so
    /// that a foreign tenant's record and a missing record look the same.
    async fn find_record(&self, id: AggregateId) -> Result<AggregateRecord>;
}

/// An open transaction.
///
/// Every write made through one transaction becomes visible together on
/// [`Transaction::commit`] or not at all. Dropping a transaction without
/// committing discards its writes.
#[async_trait]
pub trait Transaction: Send {
    /// Inserts a new record at [`Version::first`].
    ///
    /// Fails with `DuplicateId` or `DuplicateKey` when an identity or business
    /// key constraint is violated.
    async fn insert_record(&mut self, record: &AggregateRecord) -> Result<Version>;

    /// Replaces a record's state if, and only if, its stored version equals
    /// `expected`. The stored version becomes `expected + 1`, which is returned.
    ///
    /// On mismatch nothing is written and `VersionConflict` is returned.
    async fn update_record(&mut self, record: &AggregateRecord, expected: Version)
    -> Result<Version>;

    /// Appends an outbox entry inside this transaction.
    async fn append_outbox(&mut self, entry: &OutboxEntry) -> Result<()>;

    /// Makes all writes durable. Fails with `TransactionClosed` if the
    /// transaction already ended.
    async fn commit(&mut self) -> Result<()>;

    /// Discards all writes. A no-op once the transaction has ended, so it is
    /// safe to call on every exit path.
    async fn rollback(&mut self) -> Result<()>;

    /// Returns true until the transaction is committed or rolled back.
    fn is_active(&self) -> bool;
}
