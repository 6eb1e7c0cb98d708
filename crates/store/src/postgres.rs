use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, AggregateRecord, OutboxEntry, OutboxEntryId, OutboxRecord, OutboxSource, Result,
    StoreError, TenantId, Transaction, UnitOfWork, Version,
};

const SELECT_RECORD: &str = r#"
    SELECT id, tenant_id, aggregate_type, business_key, version, state, deleted_at,
           created_at, updated_at
    FROM aggregates
    WHERE id = $1
"#;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<AggregateRecord> {
        Ok(AggregateRecord {
            id: AggregateId::from_uuid(row.try_get::<Uuid, _>("id")?),
            tenant_id: TenantId::from_uuid(row.try_get::<Uuid, _>("tenant_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            business_key: row.try_get("business_key")?,
            version: Version::new(row.try_get("version")?),
            state: row.try_get("state")?,
            deleted_at: row.try_get("deleted_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_outbox(row: PgRow) -> Result<OutboxRecord> {
        let status: String = row.try_get("status")?;
        Ok(OutboxRecord {
            entry: OutboxEntry {
                id: OutboxEntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
                tenant_id: TenantId::from_uuid(row.try_get::<Uuid, _>("tenant_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
                event_type: row.try_get("event_type")?,
                payload: row.try_get("payload")?,
                created_at: row.try_get("created_at")?,
            },
            status: status.parse()?,
            attempts: row.try_get("attempts")?,
            last_error: row.try_get("last_error")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

#[async_trait]
impl UnitOfWork for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx: Some(tx) })
    }

    async fn find_record(&self, id: AggregateId) -> Result<AggregateRecord> {
        let row = sqlx::query(SELECT_RECORD)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        Self::row_to_record(row)
    }
}

/// Transaction handle of [`PostgresStore`].
///
/// Wraps a sqlx transaction, which rolls back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn active(&mut self) -> Result<&mut sqlx::Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or(StoreError::TransactionClosed)
    }
}

/// Maps unique-constraint violations on the aggregates table to typed errors.
fn map_record_write_error(e: sqlx::Error, record: &AggregateRecord) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        match db_err.constraint() {
            Some("aggregates_pkey") => return StoreError::DuplicateId(record.id),
            Some("unique_aggregate_business_key") => {
                return StoreError::DuplicateKey {
                    aggregate_type: record.aggregate_type.clone(),
                    business_key: record.business_key.clone().unwrap_or_default(),
                };
            }
            _ => {}
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn insert_record(&mut self, record: &AggregateRecord) -> Result<Version> {
        let tx = self.active()?;

        sqlx::query(
            r#"
            INSERT INTO aggregates
                (id, tenant_id, aggregate_type, business_key, version, state, deleted_at,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.tenant_id.as_uuid())
        .bind(&record.aggregate_type)
        .bind(&record.business_key)
        .bind(Version::first().as_i64())
        .bind(&record.state)
        .bind(record.deleted_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_record_write_error(e, record))?;

        Ok(Version::first())
    }

    #[tracing::instrument(skip(self, record), fields(aggregate_id = %record.id))]
    async fn update_record(
        &mut self,
        record: &AggregateRecord,
        expected: Version,
    ) -> Result<Version> {
        let tx = self.active()?;

        // Single conditional write: the version check and the increment happen
        // in the same statement.
        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE aggregates
            SET business_key = $3, state = $4, deleted_at = $5, updated_at = $6,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(expected.as_i64())
        .bind(&record.business_key)
        .bind(&record.state)
        .bind(record.deleted_at)
        .bind(record.updated_at)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_record_write_error(e, record))?;

        if let Some(version) = new_version {
            return Ok(Version::new(version));
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM aggregates WHERE id = $1")
            .bind(record.id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        match actual {
            Some(actual) => {
                tracing::debug!(%expected, actual, "conditional update matched no row");
                Err(StoreError::VersionConflict {
                    aggregate_id: record.id,
                    expected,
                    actual: Version::new(actual),
                })
            }
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    async fn append_outbox(&mut self, entry: &OutboxEntry) -> Result<()> {
        let tx = self.active()?;

        sqlx::query(
            r#"
            INSERT INTO outbox
                (id, tenant_id, aggregate_type, aggregate_id, event_type, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.tenant_id.as_uuid())
        .bind(&entry.aggregate_type)
        .bind(entry.aggregate_id.as_uuid())
        .bind(&entry.event_type)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        metrics::counter!("store_commits_total", "backend" => "postgres").increment(1);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            metrics::counter!("store_rollbacks_total", "backend" => "postgres").increment(1);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.tx.is_some()
    }
}

#[async_trait]
impl OutboxSource for PostgresStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, aggregate_type, aggregate_id, event_type, payload, created_at,
                   status, attempts, last_error, processed_at
            FROM outbox
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_outbox).collect()
    }

    async fn mark_processed(&self, id: OutboxEntryId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE outbox SET status = 'processed', processed_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OutboxEntryNotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: OutboxEntryId, error: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox
            SET status = 'failed', attempts = attempts + 1, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OutboxEntryNotFound(id));
        }
        Ok(())
    }
}
