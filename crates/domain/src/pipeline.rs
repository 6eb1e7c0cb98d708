//! The transactional mutation pipeline.
//!
//! Every mutating use case runs through [`MutationHandler`]:
//!
//! ```text
//! load ─► tenant guard ─► version guard ─► decide ─┐
//!                                                  │ (validation errors stop here,
//!                                                  │  no transaction is opened)
//!  begin ─► update (version CAS) ─► outbox ─► commit ─► cache / audit / relay
//!    └──────────── rollback on any failure ────┘        (best-effort)
//! ```

use std::marker::PhantomData;

use chrono::Utc;
use common::AggregateId;
use store::{OutboxEntryId, Transaction, UnitOfWork, Version};
use tokio::time::{Instant, timeout_at};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::config::PipelineConfig;
use crate::context::CallerContext;
use crate::error::DomainError;
use crate::guard;
use crate::ports::{AuditEntry, SideEffects};
use crate::repository::{TransactionExt, find_by_id};

/// Result of a committed mutation.
#[derive(Debug)]
pub struct MutationOutcome<A: Aggregate> {
    /// The aggregate as persisted, at `new_version`.
    pub aggregate: A,

    /// The events the mutation produced, in order.
    pub events: Vec<A::Event>,

    /// One outbox entry id per event, in the same order.
    pub outbox_entry_ids: Vec<OutboxEntryId>,

    pub new_version: Version,
}

/// Runs mutations of one aggregate type against a unit of work.
///
/// The handler holds no aggregate state between calls: every invocation loads
/// its own copy, and concurrent writers are arbitrated only by the store's
/// version check.
pub struct MutationHandler<U, A>
where
    U: UnitOfWork,
    A: Aggregate,
{
    uow: U,
    side_effects: SideEffects,
    config: PipelineConfig,
    _phantom: PhantomData<A>,
}

/// How the aggregate row is written inside the transaction.
#[derive(Debug, Clone, Copy)]
enum Write {
    Insert,
    Update { expected: Version },
}

impl<U, A> MutationHandler<U, A>
where
    U: UnitOfWork,
    A: Aggregate,
    DomainError: From<A::Error>,
{
    pub fn new(uow: U, side_effects: SideEffects, config: PipelineConfig) -> Self {
        Self {
            uow,
            side_effects,
            config,
            _phantom: PhantomData,
        }
    }

    pub fn unit_of_work(&self) -> &U {
        &self.uow
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads an aggregate and checks that the caller's tenant owns it.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn load(&self, ctx: &CallerContext, id: AggregateId) -> Result<A, DomainError> {
        let aggregate: A = find_by_id(&self.uow, id).await?;
        guard::assert_same_tenant(ctx.tenant_id, aggregate.tenant_id())?;
        Ok(aggregate)
    }

    /// Persists a newly built aggregate together with its creation events.
    #[tracing::instrument(
        skip_all,
        fields(aggregate_id = %aggregate.id(), tenant_id = %ctx.tenant_id)
    )]
    pub async fn create(
        &self,
        ctx: &CallerContext,
        aggregate: A,
        events: Vec<A::Event>,
    ) -> Result<MutationOutcome<A>, DomainError> {
        let started = std::time::Instant::now();
        guard::assert_same_tenant(ctx.tenant_id, aggregate.tenant_id())?;

        let deadline = ctx.deadline_or(self.config.mutation_timeout);
        let result = self
            .persist(deadline, Write::Insert, aggregate, events)
            .await;
        let outcome = self.record_result(result, started)?;

        if let Err(e) = self
            .side_effects
            .cache
            .invalidate_by_tenant(ctx.tenant_id)
            .await
        {
            side_effect_failed("cache", &e);
        }
        self.after_commit(ctx, None, &outcome).await;

        Ok(outcome)
    }

    /// Loads the aggregate, checks tenant and version, lets `decide` produce
    /// events, and commits the resulting state with its outbox entries.
    ///
    /// `decide` runs before any transaction is opened; its errors leave the
    /// store untouched. When it returns no events nothing is written and the
    /// aggregate is returned at its current version.
    #[tracing::instrument(skip(self, ctx, decide), fields(tenant_id = %ctx.tenant_id))]
    pub async fn execute<F>(
        &self,
        ctx: &CallerContext,
        id: AggregateId,
        expected_version: Version,
        decide: F,
    ) -> Result<MutationOutcome<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error> + Send,
    {
        let started = std::time::Instant::now();
        let deadline = ctx.deadline_or(self.config.mutation_timeout);

        let result = self
            .decide_and_persist(ctx, id, expected_version, deadline, decide)
            .await;
        let (before, outcome) = self.record_result(result, started)?;

        if !outcome.events.is_empty() {
            self.after_commit(ctx, Some(&before), &outcome).await;
        }
        Ok(outcome)
    }

    async fn decide_and_persist<F>(
        &self,
        ctx: &CallerContext,
        id: AggregateId,
        expected_version: Version,
        deadline: Instant,
        decide: F,
    ) -> Result<(A, MutationOutcome<A>), DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error> + Send,
    {
        let current = self.load(ctx, id).await?;
        guard::ensure_version(id, expected_version, current.version())?;

        let events = decide(&current)?;
        if events.is_empty() {
            let outcome = MutationOutcome {
                new_version: current.version(),
                aggregate: current.clone(),
                events,
                outbox_entry_ids: Vec::new(),
            };
            return Ok((current, outcome));
        }

        let mut next = current.clone();
        next.apply_events(events.iter().cloned());

        let outcome = self
            .persist(
                deadline,
                Write::Update {
                    expected: current.version(),
                },
                next,
                events,
            )
            .await?;
        Ok((current, outcome))
    }

    /// Opens a transaction, writes the aggregate and its outbox entries, and
    /// commits. Any failure after `begin` rolls the transaction back.
    async fn persist(
        &self,
        deadline: Instant,
        write: Write,
        mut aggregate: A,
        events: Vec<A::Event>,
    ) -> Result<MutationOutcome<A>, DomainError> {
        if Instant::now() >= deadline {
            return Err(DomainError::DeadlineExceeded);
        }

        let mut tx = self.uow.begin().await?;
        let result = write_and_commit(&mut tx, deadline, write, &aggregate, &events).await;

        // No-op once the commit went through.
        if let Err(rollback_err) = tx.rollback().await {
            tracing::warn!(error = %rollback_err, "rollback failed");
        }
        let (new_version, outbox_entry_ids) = result.inspect_err(|e| {
            metrics::counter!("mutation_rollbacks_total").increment(1);
            tracing::warn!(
                error = %e,
                aggregate_type = A::aggregate_type(),
                "mutation rolled back"
            );
        })?;
        metrics::counter!("mutations_committed_total").increment(1);

        aggregate.set_version(new_version);
        Ok(MutationOutcome {
            aggregate,
            events,
            outbox_entry_ids,
            new_version,
        })
    }

    fn record_result<T>(
        &self,
        result: Result<T, DomainError>,
        started: std::time::Instant,
    ) -> Result<T, DomainError> {
        metrics::histogram!("mutation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Err(e) if e.is_conflict() => {
                metrics::counter!("mutation_conflicts_total").increment(1);
                tracing::warn!(
                    error = %e,
                    aggregate_type = A::aggregate_type(),
                    "mutation rejected by version check"
                );
            }
            Err(DomainError::CommitOutcomeUnknown { aggregate_id }) => {
                tracing::warn!(%aggregate_id, "commit outcome unknown after deadline");
            }
            Err(_) | Ok(_) => {}
        }
        result
    }

    /// Post-commit notifications. Each one is isolated: a failure is logged
    /// and counted, and the remaining ones still run.
    async fn after_commit(
        &self,
        ctx: &CallerContext,
        before: Option<&A>,
        outcome: &MutationOutcome<A>,
    ) {
        let entity_id = outcome.aggregate.id();
        tracing::info!(
            %entity_id,
            aggregate_type = A::aggregate_type(),
            version = %outcome.new_version,
            events = outcome.events.len(),
            "mutation committed"
        );

        if let Err(e) = self
            .side_effects
            .cache
            .invalidate(A::aggregate_type(), entity_id)
            .await
        {
            side_effect_failed("cache", &e);
        }

        let action = outcome
            .events
            .last()
            .map(|e| e.event_type())
            .unwrap_or("unknown");
        let entry = AuditEntry {
            actor: ctx.actor,
            action: action.to_string(),
            entity_type: A::aggregate_type().to_string(),
            entity_id,
            old_value: before.and_then(snapshot),
            new_value: snapshot(&outcome.aggregate),
            tenant_id: ctx.tenant_id,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.side_effects.audit.log_action(entry).await {
            side_effect_failed("audit", &e);
        }

        if let Err(e) = self
            .side_effects
            .relay
            .notify(ctx.tenant_id, &outcome.outbox_entry_ids)
            .await
        {
            side_effect_failed("relay", &e);
        }
    }
}

/// Writes the aggregate row and one outbox entry per event, then commits.
/// The writes and the commit each get whatever is left of the deadline.
async fn write_and_commit<T, A>(
    tx: &mut T,
    deadline: Instant,
    write: Write,
    aggregate: &A,
    events: &[A::Event],
) -> Result<(Version, Vec<OutboxEntryId>), DomainError>
where
    T: Transaction,
    A: Aggregate,
{
    let writes = async {
        let version = match write {
            Write::Insert => tx.repository::<A>().create(aggregate).await?,
            Write::Update { expected } => tx.repository::<A>().update(aggregate, expected).await?,
        };
        let ids = tx.outbox().record_events(aggregate, events).await?;
        Ok::<_, DomainError>((version, ids))
    };

    let (version, ids) = timeout_at(deadline, writes)
        .await
        .map_err(|_| DomainError::DeadlineExceeded)??;

    match timeout_at(deadline, tx.commit()).await {
        Ok(committed) => committed?,
        Err(_) => {
            return Err(DomainError::CommitOutcomeUnknown {
                aggregate_id: aggregate.id(),
            });
        }
    }

    Ok((version, ids))
}

fn snapshot<A: Aggregate>(aggregate: &A) -> Option<serde_json::Value> {
    match serde_json::to_value(aggregate) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "could not serialize aggregate for audit");
            None
        }
    }
}

fn side_effect_failed(collaborator: &'static str, error: &dyn std::fmt::Display) {
    metrics::counter!("side_effect_failures_total", "collaborator" => collaborator).increment(1);
    tracing::warn!(collaborator, error = %error, "post-commit side effect failed");
}
