use std::time::Duration;

use common::{TenantId, UserId};
use tokio::time::Instant;

/// Who is calling, on behalf of which tenant, and until when.
#[derive(Debug, Clone, Copy)]
pub struct CallerContext {
    pub tenant_id: TenantId,
    pub actor: UserId,

    /// Point after which the use case must not start or finish a write.
    /// When unset, the pipeline's configured timeout applies.
    pub deadline: Option<Instant>,
}

impl CallerContext {
    pub fn new(tenant_id: TenantId, actor: UserId) -> Self {
        Self {
            tenant_id,
            actor,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the caller's deadline, or `now + fallback` when none was set.
    pub(crate) fn deadline_or(&self, fallback: Duration) -> Instant {
        self.deadline.unwrap_or_else(|| Instant::now() + fallback)
    }
}
