use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, AggregateRecord, OutboxEntry, OutboxEntryId, OutboxRecord, OutboxSource,
    OutboxStatus, Result, StoreError, Transaction, UnitOfWork, Version,
};

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<AggregateId, AggregateRecord>,
    outbox: Vec<OutboxRecord>,
    transactions_begun: u64,
    fail_outbox_writes: bool,
    fail_commits: bool,
    commit_delay: Option<Duration>,
    write_delay: Option<Duration>,
}

/// In-memory store for tests and benchmarks.
///
/// Writes are staged per transaction and applied under a single write lock at
/// commit, after re-checking every version and key constraint. Concurrent
/// transactions therefore behave like optimistic writers against a real
/// database: the first to commit wins, the others see a conflict.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent outbox append fail.
    pub async fn set_fail_outbox_writes(&self, fail: bool) {
        self.state.write().await.fail_outbox_writes = fail;
    }

    /// Makes every subsequent commit fail without applying anything.
    pub async fn set_fail_commits(&self, fail: bool) {
        self.state.write().await.fail_commits = fail;
    }

    /// Delays every commit before it applies its writes.
    pub async fn set_commit_delay(&self, delay: Option<Duration>) {
        self.state.write().await.commit_delay = delay;
    }

    /// Delays every record write and outbox append before it is staged.
    pub async fn set_write_delay(&self, delay: Option<Duration>) {
        self.state.write().await.write_delay = delay;
    }

    /// Returns the committed record with the given id.
    pub async fn record(&self, id: AggregateId) -> Option<AggregateRecord> {
        self.state.read().await.records.get(&id).cloned()
    }

    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Returns all committed outbox entries in insertion order.
    pub async fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.state
            .read()
            .await
            .outbox
            .iter()
            .map(|r| r.entry.clone())
            .collect()
    }

    /// Returns the committed outbox entries of one aggregate in insertion order.
    pub async fn outbox_entries_for(&self, aggregate_id: AggregateId) -> Vec<OutboxEntry> {
        self.state
            .read()
            .await
            .outbox
            .iter()
            .filter(|r| r.entry.aggregate_id == aggregate_id)
            .map(|r| r.entry.clone())
            .collect()
    }

    /// Returns how many transactions have been opened.
    pub async fn transactions_begun(&self) -> u64 {
        self.state.read().await.transactions_begun
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        self.state.write().await.transactions_begun += 1;
        Ok(InMemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
            active: true,
        })
    }

    async fn find_record(&self, id: AggregateId) -> Result<AggregateRecord> {
        self.state
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

#[derive(Debug)]
enum StagedWrite {
    Insert(AggregateRecord),
    Update {
        record: AggregateRecord,
        expected: Version,
    },
    Outbox(OutboxEntry),
}

/// Transaction handle of [`InMemoryStore`].
///
/// Nothing is visible to other readers until [`Transaction::commit`].
pub struct InMemoryTransaction {
    state: Arc<RwLock<MemoryState>>,
    staged: Vec<StagedWrite>,
    active: bool,
}

impl InMemoryTransaction {
    fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed)
        }
    }

    async fn write_pause(&self) {
        let delay = self.state.read().await.write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Validates a write against committed state plus this transaction's own
    /// staged writes, then stages it.
    async fn stage(&mut self, write: StagedWrite) -> Result<()> {
        self.write_pause().await;
        let mut records = self.state.read().await.records.clone();
        let mut outbox = Vec::new();
        for staged in self.staged.iter().chain(std::iter::once(&write)) {
            apply_write(&mut records, &mut outbox, staged)?;
        }
        self.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn insert_record(&mut self, record: &AggregateRecord) -> Result<Version> {
        self.ensure_active()?;
        self.stage(StagedWrite::Insert(record.clone())).await?;
        Ok(Version::first())
    }

    async fn update_record(
        &mut self,
        record: &AggregateRecord,
        expected: Version,
    ) -> Result<Version> {
        self.ensure_active()?;
        self.stage(StagedWrite::Update {
            record: record.clone(),
            expected,
        })
        .await?;
        Ok(expected.next())
    }

    async fn append_outbox(&mut self, entry: &OutboxEntry) -> Result<()> {
        self.ensure_active()?;
        if self.state.read().await.fail_outbox_writes {
            return Err(StoreError::Unavailable("outbox write rejected".to_string()));
        }
        self.write_pause().await;
        self.staged.push(StagedWrite::Outbox(entry.clone()));
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;

        let delay = self.state.read().await.commit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        self.active = false;
        let staged = std::mem::take(&mut self.staged);

        if state.fail_commits {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }

        let mut records = state.records.clone();
        let mut outbox = Vec::new();
        for write in &staged {
            apply_write(&mut records, &mut outbox, write)?;
        }

        state.records = records;
        state.outbox.extend(outbox);
        metrics::counter!("store_commits_total", "backend" => "memory").increment(1);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.active {
            self.active = false;
            self.staged.clear();
            metrics::counter!("store_rollbacks_total", "backend" => "memory").increment(1);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

fn apply_write(
    records: &mut HashMap<AggregateId, AggregateRecord>,
    outbox: &mut Vec<OutboxRecord>,
    write: &StagedWrite,
) -> Result<()> {
    match write {
        StagedWrite::Insert(record) => {
            if records.contains_key(&record.id) {
                return Err(StoreError::DuplicateId(record.id));
            }
            ensure_unique_key(records, record)?;
            let mut stored = record.clone();
            stored.version = Version::first();
            records.insert(stored.id, stored);
        }
        StagedWrite::Update { record, expected } => {
            let (actual, created_at) = records
                .get(&record.id)
                .map(|r| (r.version, r.created_at))
                .ok_or(StoreError::NotFound(record.id))?;
            if actual != *expected {
                return Err(StoreError::VersionConflict {
                    aggregate_id: record.id,
                    expected: *expected,
                    actual,
                });
            }
            ensure_unique_key(records, record)?;
            let mut stored = record.clone();
            stored.version = expected.next();
            stored.created_at = created_at;
            records.insert(stored.id, stored);
        }
        StagedWrite::Outbox(entry) => outbox.push(OutboxRecord::pending(entry.clone())),
    }
    Ok(())
}

fn ensure_unique_key(
    records: &HashMap<AggregateId, AggregateRecord>,
    record: &AggregateRecord,
) -> Result<()> {
    let Some(key) = record.business_key.as_deref() else {
        return Ok(());
    };

    let taken = records.values().any(|other| {
        other.id != record.id
            && other.tenant_id == record.tenant_id
            && other.aggregate_type == record.aggregate_type
            && other.business_key.as_deref() == Some(key)
    });

    if taken {
        return Err(StoreError::DuplicateKey {
            aggregate_type: record.aggregate_type.clone(),
            business_key: key.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl OutboxSource for InMemoryStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
        let state = self.state.read().await;
        let mut pending: Vec<OutboxRecord> = state
            .outbox
            .iter()
            .filter(|r| r.status == OutboxStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.entry.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_processed(&self, id: OutboxEntryId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .outbox
            .iter_mut()
            .find(|r| r.entry.id == id)
            .ok_or(StoreError::OutboxEntryNotFound(id))?;
        record.status = OutboxStatus::Processed;
        record.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(&self, id: OutboxEntryId, error: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .outbox
            .iter_mut()
            .find(|r| r.entry.id == id)
            .ok_or(StoreError::OutboxEntryNotFound(id))?;
        record.status = OutboxStatus::Failed;
        record.attempts += 1;
        record.last_error = Some(error.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TenantId;

    fn new_record(tenant_id: TenantId, key: &str) -> AggregateRecord {
        let now = Utc::now();
        AggregateRecord {
            id: AggregateId::new(),
            tenant_id,
            aggregate_type: "customer".to_string(),
            business_key: Some(key.to_string()),
            version: Version::first(),
            state: serde_json::json!({ "name": key }),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry_for(record: &AggregateRecord, event_type: &str) -> OutboxEntry {
        OutboxEntry::builder()
            .tenant_id(record.tenant_id)
            .aggregate_type(&record.aggregate_type)
            .aggregate_id(record.id)
            .event_type(event_type)
            .payload_bytes(b"{}".to_vec())
            .try_build()
            .unwrap()
    }

    async fn seed(store: &InMemoryStore, record: &AggregateRecord) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_record(record).await.unwrap();
        tx.append_outbox(&entry_for(record, "customer.created"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn committed_insert_is_visible_at_first_version() {
        let store = InMemoryStore::new();
        let record = new_record(TenantId::new(), "ACME");
        seed(&store, &record).await;

        let found = store.find_record(record.id).await.unwrap();
        assert_eq!(found.version, Version::first());
        assert_eq!(store.outbox_entries_for(record.id).await.len(), 1);
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let store = InMemoryStore::new();
        let record = new_record(TenantId::new(), "ACME");

        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        tx.append_outbox(&entry_for(&record, "customer.created"))
            .await
            .unwrap();

        assert!(matches!(
            store.find_record(record.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.outbox_entries().await.is_empty());

        drop(tx);
        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn update_with_stale_version_is_rejected() {
        let store = InMemoryStore::new();
        let record = new_record(TenantId::new(), "ACME");
        seed(&store, &record).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx.update_record(&record, Version::new(3)).await;
        assert!(matches!(
            result,
            Err(StoreError::VersionConflict { expected, actual, .. })
                if expected == Version::new(3) && actual == Version::first()
        ));
    }

    #[tokio::test]
    async fn concurrent_updates_from_same_version_only_one_commits() {
        let store = InMemoryStore::new();
        let record = new_record(TenantId::new(), "ACME");
        seed(&store, &record).await;

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        assert_eq!(
            first.update_record(&record, Version::first()).await.unwrap(),
            Version::new(2)
        );
        second
            .update_record(&record, Version::first())
            .await
            .unwrap();

        first.commit().await.unwrap();
        let result = second.commit().await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
        assert!(!second.is_active());
        assert_eq!(
            store.find_record(record.id).await.unwrap().version,
            Version::new(2)
        );
    }

    #[tokio::test]
    async fn rollback_discards_and_is_idempotent() {
        let store = InMemoryStore::new();
        let record = new_record(TenantId::new(), "ACME");

        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        tx.rollback().await.unwrap();
        tx.rollback().await.unwrap();

        assert!(!tx.is_active());
        assert_eq!(store.record_count().await, 0);
        assert!(matches!(
            tx.commit().await,
            Err(StoreError::TransactionClosed)
        ));
    }

    #[tokio::test]
    async fn rollback_after_commit_is_a_noop() {
        let store = InMemoryStore::new();
        let record = new_record(TenantId::new(), "ACME");

        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        tx.commit().await.unwrap();
        tx.rollback().await.unwrap();

        assert!(store.record(record.id).await.is_some());
    }

    #[tokio::test]
    async fn business_key_is_unique_per_tenant() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        seed(&store, &new_record(tenant, "ACME")).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx.insert_record(&new_record(tenant, "ACME")).await;
        assert!(matches!(
            result,
            Err(StoreError::DuplicateKey { business_key, .. }) if business_key == "ACME"
        ));

        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&new_record(TenantId::new(), "ACME"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn injected_outbox_failure_is_reported() {
        let store = InMemoryStore::new();
        store.set_fail_outbox_writes(true).await;
        let record = new_record(TenantId::new(), "ACME");

        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        let result = tx.append_outbox(&entry_for(&record, "customer.created")).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn injected_commit_failure_applies_nothing() {
        let store = InMemoryStore::new();
        store.set_fail_commits(true).await;
        let record = new_record(TenantId::new(), "ACME");

        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        tx.append_outbox(&entry_for(&record, "customer.created"))
            .await
            .unwrap();

        assert!(tx.commit().await.is_err());
        assert_eq!(store.record_count().await, 0);
        assert!(store.outbox_entries().await.is_empty());
    }

    #[tokio::test]
    async fn relay_marks_entries() {
        let store = InMemoryStore::new();
        let first = new_record(TenantId::new(), "ACME");
        let second = new_record(TenantId::new(), "GLOBEX");
        seed(&store, &first).await;
        seed(&store, &second).await;

        let pending = store.fetch_pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].entry.aggregate_id, first.id);

        store.mark_processed(pending[0].entry.id).await.unwrap();
        store
            .mark_failed(pending[1].entry.id, "broker down")
            .await
            .unwrap();

        assert!(store.fetch_pending(10).await.unwrap().is_empty());

        let missing = store.mark_processed(OutboxEntryId::new()).await;
        assert!(matches!(missing, Err(StoreError::OutboxEntryNotFound(_))));
    }
}
