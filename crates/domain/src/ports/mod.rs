//! Collaborators notified after a mutation commits.
//!
//! Every call here is best-effort: the pipeline logs and counts failures but
//! never reports them as a failure of the mutation, because the state change
//! is already durable.

mod audit;
mod cache;
mod relay;

use std::sync::Arc;

use thiserror::Error;

pub use audit::{AuditEntry, AuditLogger, InMemoryAuditLog};
pub use cache::{Cache, CacheInvalidation, InMemoryCache};
pub use relay::{InMemoryRelayNotifier, RelayNotifier};

/// Failure reported by a post-commit collaborator.
#[derive(Debug, Error)]
pub enum SideEffectError {
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        collaborator: &'static str,
        message: String,
    },
}

/// The set of collaborators a mutation handler notifies after commit.
#[derive(Clone)]
pub struct SideEffects {
    pub cache: Arc<dyn Cache>,
    pub audit: Arc<dyn AuditLogger>,
    pub relay: Arc<dyn RelayNotifier>,
}

impl SideEffects {
    pub fn new(
        cache: Arc<dyn Cache>,
        audit: Arc<dyn AuditLogger>,
        relay: Arc<dyn RelayNotifier>,
    ) -> Self {
        Self {
            cache,
            audit,
            relay,
        }
    }

    /// Side effects backed by fresh in-memory collaborators.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(InMemoryRelayNotifier::new()),
        )
    }
}
