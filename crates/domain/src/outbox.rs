//! Outbox writes for domain events.

use store::{OutboxEntry, OutboxEntryId, Transaction};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Appends outbox entries inside the caller's transaction.
///
/// Never opens a transaction of its own. Entries are written in the order
/// given; no deduplication is performed.
pub struct OutboxWriter<'tx, T: Transaction> {
    tx: &'tx mut T,
}

impl<'tx, T: Transaction> OutboxWriter<'tx, T> {
    pub fn new(tx: &'tx mut T) -> Self {
        Self { tx }
    }

    pub async fn create(&mut self, entry: &OutboxEntry) -> Result<(), DomainError> {
        self.tx.append_outbox(entry).await?;
        metrics::counter!("outbox_entries_written_total").increment(1);
        Ok(())
    }

    /// Writes one entry per event and returns their ids.
    pub async fn record_events<A: Aggregate>(
        &mut self,
        aggregate: &A,
        events: &[A::Event],
    ) -> Result<Vec<OutboxEntryId>, DomainError> {
        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            let entry = entry_for(aggregate, event)?;
            self.create(&entry).await?;
            ids.push(entry.id);
        }
        Ok(ids)
    }
}

/// Builds the outbox entry describing `event` on `aggregate`.
pub fn entry_for<A: Aggregate>(
    aggregate: &A,
    event: &A::Event,
) -> Result<OutboxEntry, DomainError> {
    OutboxEntry::builder()
        .tenant_id(aggregate.tenant_id())
        .aggregate_type(A::aggregate_type())
        .aggregate_id(aggregate.id())
        .event_type(event.event_type())
        .payload(event)?
        .try_build()
        .ok_or_else(|| DomainError::Internal("outbox entry is missing required fields".to_string()))
}
