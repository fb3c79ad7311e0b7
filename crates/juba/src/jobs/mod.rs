//! Job lifecycle: posting, applications, selection, completion, and removal.
//!
//! Every status change is a conditional write keyed on the status the caller
//! observed, so concurrent selections on one job produce exactly one winner.
//! Notifications and payment bookkeeping ride along as best-effort side
//! channels that never undo a committed transition.

pub mod domain;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod memory;
pub mod payments;
mod policy;
pub mod queries;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, Job, JobFields, JobId,
    JobPatch, JobStatus, PaymentStatus, Rate, RateError, TransactionId, TransactionRecord, UserId,
};
pub use error::{ErrorCode, LifecycleError};
pub use events::{
    DispatchPolicy, DomainEvent, EventDispatcher, EventKind, EventPayload, EventPublisher,
    PublishError,
};
pub use lifecycle::{Decision, JobEvent, JobStateMachine, TransitionError};
pub use memory::MemoryStore;
pub use payments::{
    PaymentError, PaymentGateway, PaymentReceipt, PaymentRequest, SimulatedPaymentGateway,
};
pub use policy::ApplicationPolicy;
pub use queries::{ClientStats, FreelancerStats, JobDetail, JobQuery, JobStatusView, Page};
pub use repository::{
    ApplicationFilter, ApplicationRepository, JobFilter, JobRepository, RepositoryError,
    StatusChange, TransactionRepository,
};
pub use router::job_router;
pub use service::{Acceptance, Collaborators, DeletedJob, JobLifecycleService, PaymentOutcome};
