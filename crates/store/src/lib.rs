//! Persistence primitives for the CRM mutation pipeline.
//!
//! The store knows nothing about customers. It persists opaque, versioned
//! aggregate records and append-only outbox entries, and guarantees that
//! everything written through one [`Transaction`] becomes visible together
//! or not at all.
//!
//! Two backends are provided:
//! - [`InMemoryStore`] for tests and benchmarks, with fault injection
//! - [`PostgresStore`] backed by sqlx

pub mod config;
pub mod error;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod record;
pub mod unit_of_work;

pub use common::{AggregateId, TenantId};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use outbox::{
    OutboxEntry, OutboxEntryBuilder, OutboxEntryId, OutboxRecord, OutboxSource, OutboxStatus,
};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use record::{AggregateRecord, Version};
pub use unit_of_work::{Transaction, UnitOfWork};
