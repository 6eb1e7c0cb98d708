use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::SideEffectError;

/// One audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: UserId,

    /// Event type that describes the action, e.g. `customer.status_changed`.
    pub action: String,

    pub entity_type: String,
    pub entity_id: AggregateId,

    /// State before the mutation; absent for creations.
    pub old_value: Option<serde_json::Value>,

    pub new_value: Option<serde_json::Value>,
    pub tenant_id: TenantId,
    pub timestamp: DateTime<Utc>,
}

/// Audit trail writer.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log_action(&self, entry: AuditEntry) -> Result<(), SideEffectError>;
}

#[derive(Debug, Default)]
struct AuditState {
    entries: Vec<AuditEntry>,
    fail: bool,
}

/// In-memory audit log, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    state: Arc<RwLock<AuditState>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.state.read().await.entries.clone()
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLog {
    async fn log_action(&self, entry: AuditEntry) -> Result<(), SideEffectError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(SideEffectError::Unavailable {
                collaborator: "audit",
                message: "audit sink rejected entry".to_string(),
            });
        }
        state.entries.push(entry);
        Ok(())
    }
}
