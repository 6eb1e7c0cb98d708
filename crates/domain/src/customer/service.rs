//! Customer use cases.

use common::AggregateId;
use store::UnitOfWork;

use crate::command::Command;
use crate::config::PipelineConfig;
use crate::context::CallerContext;
use crate::error::DomainError;
use crate::pipeline::{MutationHandler, MutationOutcome};
use crate::ports::SideEffects;

use super::{
    AddContact, AddTag, AssignOwner, ChangeCustomerStatus, ChangeTier, Customer, CustomerError,
    DeleteCustomer, ReactivateCustomer, RegisterCustomer, RemoveContact, RemoveTag,
    RestoreCustomer, SetPrimaryContact, UnassignOwner, UpdateContact, UpdateCustomer,
};

/// Service for managing customers.
///
/// Each use case is one transaction: the customer row and its outbox entries
/// commit together or not at all. Cache, audit and relay notifications run
/// after the commit and never fail the call.
pub struct CustomerService<U: UnitOfWork> {
    handler: MutationHandler<U, Customer>,
}

impl<U: UnitOfWork> CustomerService<U> {
    pub fn new(uow: U, side_effects: SideEffects, config: PipelineConfig) -> Self {
        Self {
            handler: MutationHandler::new(uow, side_effects, config),
        }
    }

    /// Returns a reference to the underlying mutation handler.
    pub fn handler(&self) -> &MutationHandler<U, Customer> {
        &self.handler
    }

    /// Reads a customer. Deleted customers and customers of other tenants
    /// are reported as not found.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_customer(
        &self,
        ctx: &CallerContext,
        customer_id: AggregateId,
    ) -> Result<Customer, DomainError> {
        let customer = self.handler.load(ctx, customer_id).await?;
        if customer.is_deleted() {
            return Err(DomainError::NotFound {
                entity: "customer",
                id: customer_id.to_string(),
            });
        }
        Ok(customer)
    }

    /// Registers a new customer at version 1.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn register_customer(
        &self,
        ctx: &CallerContext,
        cmd: RegisterCustomer,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let mut builder = Customer::builder(ctx.tenant_id, ctx.actor)
            .name(cmd.name)
            .customer_type(cmd.customer_type)
            .tier(cmd.tier)
            .tags(cmd.tags);
        if let Some(code) = cmd.code {
            builder = builder.code(code);
        }
        if let Some(email) = cmd.email {
            builder = builder.email(email);
        }
        if let Some(phone) = cmd.phone {
            builder = builder.phone(phone);
        }
        if let Some(notes) = cmd.notes {
            builder = builder.notes(notes);
        }
        if let Some(owner_id) = cmd.owner_id {
            builder = builder.owner(owner_id);
        }

        let (customer, events) = builder.build()?;
        self.handler.create(ctx, customer, events).await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_customer(
        &self,
        ctx: &CallerContext,
        cmd: UpdateCustomer,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let details = cmd.details.clone();
        self.run(ctx, &cmd, move |customer| customer.update_details(&details))
            .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn change_status(
        &self,
        ctx: &CallerContext,
        cmd: ChangeCustomerStatus,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let status = cmd.status;
        let reason = cmd.reason.clone();
        self.run(ctx, &cmd, move |customer| {
            customer.change_status(status, reason.as_deref())
        })
        .await
    }

    /// Administrative override for churned and blocked customers.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn reactivate_customer(
        &self,
        ctx: &CallerContext,
        cmd: ReactivateCustomer,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let reason = cmd.reason.clone();
        self.run(ctx, &cmd, move |customer| customer.reactivate(&reason))
            .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn assign_owner(
        &self,
        ctx: &CallerContext,
        cmd: AssignOwner,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let owner_id = cmd.owner_id;
        self.run(ctx, &cmd, move |customer| customer.assign_owner(owner_id))
            .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn unassign_owner(
        &self,
        ctx: &CallerContext,
        cmd: UnassignOwner,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        self.run(ctx, &cmd, |customer| customer.unassign_owner())
            .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn change_tier(
        &self,
        ctx: &CallerContext,
        cmd: ChangeTier,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let tier = cmd.tier;
        self.run(ctx, &cmd, move |customer| customer.change_tier(tier))
            .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn add_tag(
        &self,
        ctx: &CallerContext,
        cmd: AddTag,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let tag = cmd.tag.clone();
        self.run(ctx, &cmd, move |customer| customer.add_tag(&tag))
            .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn remove_tag(
        &self,
        ctx: &CallerContext,
        cmd: RemoveTag,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let tag = cmd.tag.clone();
        self.run(ctx, &cmd, move |customer| customer.remove_tag(&tag))
            .await
    }

    /// Adds a contact, enforcing the configured contact limit.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn add_contact(
        &self,
        ctx: &CallerContext,
        cmd: AddContact,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let contact = cmd.contact.clone();
        let max_contacts = self.handler.config().max_contacts;
        self.run(ctx, &cmd, move |customer| {
            customer.add_contact(&contact, max_contacts)
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_contact(
        &self,
        ctx: &CallerContext,
        cmd: UpdateContact,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let contact_id = cmd.contact_id;
        let expected = cmd.expected_contact_version;
        let details = cmd.details.clone();
        self.run(ctx, &cmd, move |customer| {
            customer.update_contact(contact_id, expected, &details)
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn remove_contact(
        &self,
        ctx: &CallerContext,
        cmd: RemoveContact,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let contact_id = cmd.contact_id;
        let expected = cmd.expected_contact_version;
        self.run(ctx, &cmd, move |customer| {
            customer.remove_contact(contact_id, expected)
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn set_primary_contact(
        &self,
        ctx: &CallerContext,
        cmd: SetPrimaryContact,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let contact_id = cmd.contact_id;
        let expected = cmd.expected_contact_version;
        self.run(ctx, &cmd, move |customer| {
            customer.set_primary_contact(contact_id, expected)
        })
        .await
    }

    /// Soft-deletes a customer. The row stays, marked deleted.
    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_customer(
        &self,
        ctx: &CallerContext,
        cmd: DeleteCustomer,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let actor = ctx.actor;
        self.run(ctx, &cmd, move |customer| customer.soft_delete(actor))
            .await
    }

    #[tracing::instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn restore_customer(
        &self,
        ctx: &CallerContext,
        cmd: RestoreCustomer,
    ) -> Result<MutationOutcome<Customer>, DomainError> {
        let actor = ctx.actor;
        self.run(ctx, &cmd, move |customer| customer.restore(actor))
            .await
    }

    async fn run<C, F>(
        &self,
        ctx: &CallerContext,
        cmd: &C,
        decide: F,
    ) -> Result<MutationOutcome<Customer>, DomainError>
    where
        C: Command<Aggregate = Customer>,
        F: FnOnce(&Customer) -> Result<Vec<super::CustomerEvent>, CustomerError> + Send,
    {
        self.handler
            .execute(ctx, cmd.aggregate_id(), cmd.expected_version(), decide)
            .await
    }
}
