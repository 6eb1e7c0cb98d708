use std::sync::Arc;

use async_trait::async_trait;
use common::TenantId;
use store::OutboxEntryId;
use tokio::sync::RwLock;

use super::SideEffectError;

/// Wakes the outbox relay after new entries commit.
///
/// Only a latency hint: the relay polls the outbox regardless, so a lost
/// notification delays delivery but never loses an event.
#[async_trait]
pub trait RelayNotifier: Send + Sync {
    async fn notify(
        &self,
        tenant_id: TenantId,
        entry_ids: &[OutboxEntryId],
    ) -> Result<(), SideEffectError>;
}

#[derive(Debug, Default)]
struct RelayState {
    notified: Vec<OutboxEntryId>,
    fail: bool,
}

/// In-memory relay notifier, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelayNotifier {
    state: Arc<RwLock<RelayState>>,
}

impl InMemoryRelayNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    /// Returns every entry id notified so far.
    pub async fn notified(&self) -> Vec<OutboxEntryId> {
        self.state.read().await.notified.clone()
    }
}

#[async_trait]
impl RelayNotifier for InMemoryRelayNotifier {
    async fn notify(
        &self,
        _tenant_id: TenantId,
        entry_ids: &[OutboxEntryId],
    ) -> Result<(), SideEffectError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(SideEffectError::Unavailable {
                collaborator: "relay",
                message: "notification channel closed".to_string(),
            });
        }
        state.notified.extend_from_slice(entry_ids);
        Ok(())
    }
}
