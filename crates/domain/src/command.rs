//! Commands addressed to an existing aggregate.

use common::AggregateId;
use store::Version;

use crate::aggregate::Aggregate;

/// A request to mutate one aggregate.
///
/// Every command names the version the caller last observed. The pipeline
/// rejects it with a version conflict when the stored version has moved on.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;

    /// Returns the version the caller expects the aggregate to be at.
    fn expected_version(&self) -> Version;
}
