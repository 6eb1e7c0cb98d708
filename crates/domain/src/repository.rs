//! Typed persistence of aggregates through the store's record interface.

use std::marker::PhantomData;

use chrono::Utc;
use common::AggregateId;
use store::{AggregateRecord, StoreError, Transaction, UnitOfWork, Version};

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::outbox::OutboxWriter;

/// Repository for one aggregate type, bound to an open transaction.
///
/// Obtained through [`TransactionExt::repository`], so every write it makes
/// shares the transaction with the outbox writes of the same mutation.
pub struct Repository<'tx, T: Transaction, A: Aggregate> {
    tx: &'tx mut T,
    _phantom: PhantomData<A>,
}

impl<'tx, T: Transaction, A: Aggregate> Repository<'tx, T, A> {
    pub fn new(tx: &'tx mut T) -> Self {
        Self {
            tx,
            _phantom: PhantomData,
        }
    }

    /// Persists a new aggregate at version 1.
    pub async fn create(&mut self, aggregate: &A) -> Result<Version, DomainError> {
        let record = to_record(aggregate)?;
        Ok(self.tx.insert_record(&record).await?)
    }

    /// Persists the aggregate's state if the stored version still equals
    /// `expected`, returning the incremented version.
    pub async fn update(
        &mut self,
        aggregate: &A,
        expected: Version,
    ) -> Result<Version, DomainError> {
        let record = to_record(aggregate)?;
        self.tx
            .update_record(&record, expected)
            .await
            .map_err(not_found_as::<A>)
    }
}

/// Loads an aggregate by id, without any tenant filtering.
///
/// Soft-deleted aggregates are returned as well; use cases decide what a
/// deleted aggregate means for them.
pub async fn find_by_id<A, U>(uow: &U, id: AggregateId) -> Result<A, DomainError>
where
    A: Aggregate,
    U: UnitOfWork + ?Sized,
{
    let record = uow.find_record(id).await.map_err(not_found_as::<A>)?;
    if record.aggregate_type != A::aggregate_type() {
        return Err(not_found::<A>(id));
    }

    let mut aggregate: A = serde_json::from_value(record.state)?;
    aggregate.set_version(record.version);
    Ok(aggregate)
}

/// Accessors for transaction-bound repositories and outbox writers.
pub trait TransactionExt: Transaction + Sized {
    fn repository<A: Aggregate>(&mut self) -> Repository<'_, Self, A> {
        Repository::new(self)
    }

    fn outbox(&mut self) -> OutboxWriter<'_, Self> {
        OutboxWriter::new(self)
    }
}

impl<T: Transaction> TransactionExt for T {}

fn to_record<A: Aggregate>(aggregate: &A) -> Result<AggregateRecord, DomainError> {
    let now = Utc::now();
    Ok(AggregateRecord {
        id: aggregate.id(),
        tenant_id: aggregate.tenant_id(),
        aggregate_type: A::aggregate_type().to_string(),
        business_key: aggregate.business_key(),
        version: aggregate.version(),
        state: serde_json::to_value(aggregate)?,
        deleted_at: aggregate.deleted_at(),
        created_at: now,
        updated_at: now,
    })
}

fn not_found<A: Aggregate>(id: AggregateId) -> DomainError {
    DomainError::NotFound {
        entity: A::aggregate_type(),
        id: id.to_string(),
    }
}

fn not_found_as<A: Aggregate>(e: StoreError) -> DomainError {
    match e {
        StoreError::NotFound(id) => not_found::<A>(id),
        other => other.into(),
    }
}
