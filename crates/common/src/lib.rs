//! Identifier newtypes shared by the store and domain crates.

mod types;

pub use types::{AggregateId, ContactId, TenantId, UserId};
