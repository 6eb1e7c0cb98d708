use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, TenantId};
use tokio::sync::RwLock;

use super::SideEffectError;

/// Read-cache invalidation.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Drops cached reads of one entity.
    async fn invalidate(
        &self,
        entity_type: &str,
        entity_id: AggregateId,
    ) -> Result<(), SideEffectError>;

    /// Drops every cached read scoped to a tenant (lists, counts).
    async fn invalidate_by_tenant(&self, tenant_id: TenantId) -> Result<(), SideEffectError>;
}

/// An invalidation recorded by [`InMemoryCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheInvalidation {
    Entity {
        entity_type: String,
        entity_id: AggregateId,
    },
    Tenant(TenantId),
}

#[derive(Debug, Default)]
struct CacheState {
    invalidations: Vec<CacheInvalidation>,
    fail: bool,
}

/// In-memory cache that records invalidations, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    pub async fn invalidations(&self) -> Vec<CacheInvalidation> {
        self.state.read().await.invalidations.clone()
    }

    async fn record(&self, invalidation: CacheInvalidation) -> Result<(), SideEffectError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(SideEffectError::Unavailable {
                collaborator: "cache",
                message: "connection refused".to_string(),
            });
        }
        state.invalidations.push(invalidation);
        Ok(())
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn invalidate(
        &self,
        entity_type: &str,
        entity_id: AggregateId,
    ) -> Result<(), SideEffectError> {
        self.record(CacheInvalidation::Entity {
            entity_type: entity_type.to_string(),
            entity_id,
        })
        .await
    }

    async fn invalidate_by_tenant(&self, tenant_id: TenantId) -> Result<(), SideEffectError> {
        self.record(CacheInvalidation::Tenant(tenant_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_invalidations() {
        let cache = InMemoryCache::new();
        let id = AggregateId::new();
        let tenant = TenantId::new();

        cache.invalidate("customer", id).await.unwrap();
        cache.invalidate_by_tenant(tenant).await.unwrap();

        assert_eq!(
            cache.invalidations().await,
            vec![
                CacheInvalidation::Entity {
                    entity_type: "customer".to_string(),
                    entity_id: id,
                },
                CacheInvalidation::Tenant(tenant),
            ]
        );
    }

    #[tokio::test]
    async fn fail_switch_rejects_calls() {
        let cache = InMemoryCache::new();
        cache.set_fail(true).await;

        assert!(cache.invalidate("customer", AggregateId::new()).await.is_err());
        assert!(cache.invalidations().await.is_empty());
    }
}
