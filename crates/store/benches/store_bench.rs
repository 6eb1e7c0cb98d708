use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use store::{
    AggregateId, AggregateRecord, InMemoryStore, OutboxEntry, TenantId, Transaction, UnitOfWork,
    Version,
};

fn make_record() -> AggregateRecord {
    let now = Utc::now();
    AggregateRecord {
        id: AggregateId::new(),
        tenant_id: TenantId::new(),
        aggregate_type: "customer".to_string(),
        business_key: None,
        version: Version::first(),
        state: serde_json::json!({ "name": "Bench Corp" }),
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn make_entry(record: &AggregateRecord) -> OutboxEntry {
    OutboxEntry::builder()
        .tenant_id(record.tenant_id)
        .aggregate_type("customer")
        .aggregate_id(record.id)
        .event_type("customer.updated")
        .payload_bytes(b"{}".to_vec())
        .try_build()
        .unwrap()
}

fn bench_insert_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();

    c.bench_function("store/insert_with_outbox", |b| {
        b.iter(|| {
            rt.block_on(async {
                let record = make_record();
                let mut tx = store.begin().await.unwrap();
                tx.insert_record(&record).await.unwrap();
                tx.append_outbox(&make_entry(&record)).await.unwrap();
                tx.commit().await.unwrap();
            });
        });
    });
}

fn bench_update_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let record = make_record();
    rt.block_on(async {
        let mut tx = store.begin().await.unwrap();
        tx.insert_record(&record).await.unwrap();
        tx.commit().await.unwrap();
    });

    let mut version = Version::first();
    c.bench_function("store/update_with_outbox", |b| {
        b.iter(|| {
            version = rt.block_on(async {
                let mut tx = store.begin().await.unwrap();
                let next = tx.update_record(&record, version).await.unwrap();
                tx.append_outbox(&make_entry(&record)).await.unwrap();
                tx.commit().await.unwrap();
                next
            });
        });
    });
}

criterion_group!(benches, bench_insert_commit, bench_update_commit);
criterion_main!(benches);
