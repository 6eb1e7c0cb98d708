//! Domain layer for the CRM mutation pipeline.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for versioned state
//! - Tenant and version guards
//! - A repository and outbox writer bound to one transaction
//! - The MutationHandler that runs every change as one unit of work
//! - The Customer aggregate and its use cases

pub mod aggregate;
pub mod command;
pub mod config;
pub mod context;
pub mod customer;
pub mod error;
pub mod guard;
pub mod outbox;
pub mod pipeline;
pub mod ports;
pub mod repository;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::Command;
pub use config::PipelineConfig;
pub use context::CallerContext;
pub use customer::{
    AddContact, AddTag, AssignOwner, ChangeCustomerStatus, ChangeTier, Contact, ContactDetails,
    ContactRole, Customer, CustomerDetails, CustomerError, CustomerEvent, CustomerService,
    CustomerStatus, CustomerTier, CustomerType, DeleteCustomer, NewContact, ReactivateCustomer,
    RegisterCustomer, RemoveContact, RemoveTag, RestoreCustomer, SetPrimaryContact,
    UnassignOwner, UpdateContact, UpdateCustomer,
};
pub use error::{DomainError, ErrorKind};
pub use pipeline::{MutationHandler, MutationOutcome};
pub use ports::{SideEffectError, SideEffects};
pub use repository::{Repository, TransactionExt, find_by_id};
