//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId};
use serde::{Serialize, de::DeserializeOwned};
use store::Version;

/// Trait for domain events.
///
/// Domain events are immutable facts produced by aggregate command methods.
/// They are serialized into the outbox payload.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the stable event type string, e.g. `customer.created`.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates persisted as versioned state.
///
/// Command methods on an aggregate take `&self`, validate, and return the
/// events describing the change without touching state. [`Aggregate::apply`]
/// then folds those events into a copy of the state. Persistence and the
/// version counter belong to the mutation pipeline, never to the aggregate.
pub trait Aggregate: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The type of events this aggregate produces.
    type Event: DomainEvent;

    /// The type of errors its command methods return.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name stored alongside each record.
    fn aggregate_type() -> &'static str;

    fn id(&self) -> AggregateId;

    /// Returns the owning tenant. Fixed at creation.
    fn tenant_id(&self) -> TenantId;

    fn version(&self) -> Version;

    /// Sets the version. Called by the pipeline after load and after commit.
    fn set_version(&mut self, version: Version);

    /// Natural key that must be unique per tenant, if the aggregate has one.
    fn business_key(&self) -> Option<String> {
        None
    }

    /// Soft-delete marker.
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Applies an event to the aggregate.
    ///
    /// Must not fail: events are produced only after validation succeeded.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Incremented { by: i32 },
        Reset,
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Incremented { .. } => "counter.incremented",
                CounterEvent::Reset => "counter.reset",
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Counter {
        id: AggregateId,
        tenant_id: TenantId,
        value: i32,
        #[serde(skip)]
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("counter error")]
    struct CounterError;

    impl Aggregate for Counter {
        type Event = CounterEvent;
        type Error = CounterError;

        fn aggregate_type() -> &'static str {
            "counter"
        }

        fn id(&self) -> AggregateId {
            self.id
        }

        fn tenant_id(&self) -> TenantId {
            self.tenant_id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                CounterEvent::Incremented { by } => self.value += by,
                CounterEvent::Reset => self.value = 0,
            }
        }
    }

    #[test]
    fn apply_events_folds_in_order() {
        let mut counter = Counter {
            id: AggregateId::new(),
            tenant_id: TenantId::new(),
            value: 5,
            version: Version::first(),
        };

        counter.apply_events(vec![
            CounterEvent::Reset,
            CounterEvent::Incremented { by: 2 },
            CounterEvent::Incremented { by: 3 },
        ]);

        assert_eq!(counter.value, 5);
        assert_eq!(counter.version(), Version::first());
    }

    #[test]
    fn defaults_have_no_key_and_no_delete_marker() {
        let counter = Counter {
            id: AggregateId::new(),
            tenant_id: TenantId::new(),
            value: 0,
            version: Version::first(),
        };
        assert!(counter.business_key().is_none());
        assert!(counter.deleted_at().is_none());
        assert_eq!(CounterEvent::Reset.event_type(), "counter.reset");
    }
}
