//! Tenant and version checks applied before any mutation.

use common::{AggregateId, TenantId};
use store::Version;

use crate::error::DomainError;

/// Fails with [`DomainError::TenantMismatch`] unless the caller's tenant owns
/// the aggregate.
///
/// Every read and mutation calls this immediately after loading.
pub fn assert_same_tenant(caller: TenantId, owner: TenantId) -> Result<(), DomainError> {
    if caller == owner {
        Ok(())
    } else {
        Err(DomainError::TenantMismatch)
    }
}

/// Fails with [`DomainError::VersionConflict`] unless the version the caller
/// last observed is the aggregate's current version.
///
/// This only narrows the race window; the store repeats the check atomically
/// when writing.
pub fn ensure_version(
    aggregate_id: AggregateId,
    expected: Version,
    actual: Version,
) -> Result<(), DomainError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DomainError::VersionConflict {
            aggregate_id,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tenant_passes() {
        let tenant = TenantId::new();
        assert!(assert_same_tenant(tenant, tenant).is_ok());
    }

    #[test]
    fn different_tenant_is_rejected() {
        let result = assert_same_tenant(TenantId::new(), TenantId::new());
        assert!(matches!(result, Err(DomainError::TenantMismatch)));
    }

    #[test]
    fn stale_version_carries_both_values() {
        let id = AggregateId::new();
        let result = ensure_version(id, Version::first(), Version::new(2));
        assert!(matches!(
            result,
            Err(DomainError::VersionConflict { expected, actual, .. })
                if expected == Version::first() && actual == Version::new(2)
        ));
        assert!(ensure_version(id, Version::new(2), Version::new(2)).is_ok());
    }
}
