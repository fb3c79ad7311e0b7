use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, Job, JobFields, JobId, JobPatch,
    JobStatus, PaymentStatus, Rate, TransactionRecord,
};
use super::error::{ErrorCode, LifecycleError};
use super::events::{DispatchPolicy, DomainEvent, EventDispatcher, EventPublisher};
use super::lifecycle::{Decision, JobEvent, JobStateMachine, TransitionError};
use super::memory::MemoryStore;
use super::payments::{PaymentGateway, PaymentRequest, SimulatedPaymentGateway};
use super::policy::ApplicationPolicy;
use super::repository::{
    ApplicationFilter, ApplicationRepository, JobFilter, JobRepository, StatusChange,
    TransactionRepository,
};
use super::validation::validate_job_fields;
use crate::clock::{Clock, SystemClock};
use crate::ratings::RatingRepository;
use crate::reports::ReportRepository;

/// How long a completed job stays visible before it is due for archiving.
pub const ARCHIVE_AFTER_HOURS: i64 = 24;

/// Ports the lifecycle service talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub jobs: Arc<dyn JobRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub ratings: Arc<dyn RatingRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub publisher: Arc<dyn EventPublisher>,
    pub payments: Arc<dyn PaymentGateway>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Every table served by one [`MemoryStore`], a simulated payment
    /// gateway, and the system clock.
    pub fn in_memory(store: Arc<MemoryStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            jobs: store.clone(),
            applications: store.clone(),
            transactions: store.clone(),
            ratings: store.clone(),
            reports: store,
            publisher,
            payments: Arc::new(SimulatedPaymentGateway),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }
}

/// Result of a successful selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acceptance {
    pub job: Job,
    pub application: Application,
    /// Other pending applications closed by the selection.
    pub auto_rejected: Vec<Application>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedJob {
    pub job_id: JobId,
    pub previous_status: JobStatus,
    pub status: JobStatus,
    pub removed_applications: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentOutcome {
    pub job_id: JobId,
    pub amount: Rate,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
}

/// Owns every job and application transition.
pub struct JobLifecycleService {
    pub(super) jobs: Arc<dyn JobRepository>,
    pub(super) applications: Arc<dyn ApplicationRepository>,
    pub(super) transactions: Arc<dyn TransactionRepository>,
    pub(super) ratings: Arc<dyn RatingRepository>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    events: EventDispatcher,
    policy: ApplicationPolicy,
    machine: JobStateMachine,
}

impl JobLifecycleService {
    pub fn new(
        collaborators: Collaborators,
        policy: ApplicationPolicy,
        dispatch: DispatchPolicy,
    ) -> Self {
        Self {
            jobs: collaborators.jobs,
            applications: collaborators.applications,
            transactions: collaborators.transactions,
            ratings: collaborators.ratings,
            payments: collaborators.payments,
            clock: collaborators.clock,
            events: EventDispatcher::new(collaborators.publisher, dispatch),
            policy,
            machine: JobStateMachine::new(policy.allow_complete_from_posted),
        }
    }

    /// Post a new job for the acting client.
    pub async fn create_job(&self, actor: &Actor, fields: JobFields) -> Result<Job, LifecycleError> {
        if !actor.role.can_post() {
            return Err(LifecycleError::unauthorized(
                ErrorCode::RoleNotPermitted,
                "only clients can post jobs",
            ));
        }
        let fields = validate_job_fields(fields)?;

        if let Some(cap) = self.policy.max_active_jobs_per_client {
            let active = self
                .jobs
                .find(&JobFilter::owned_by(actor.actor_id))
                .await?
                .iter()
                .filter(|job| job.status.is_active())
                .count();
            if active >= cap as usize {
                return Err(LifecycleError::conflict(
                    ErrorCode::ActiveJobLimit,
                    format!("clients may have at most {cap} active jobs"),
                ));
            }
        }

        let job = self
            .jobs
            .insert(Job::posted(actor.actor_id, fields, self.clock.now()))
            .await?;
        info!(job_id = %job.id, client_id = %job.client_id, "job posted");

        self.events.dispatch(DomainEvent::job_posted(&job)).await;
        Ok(job)
    }

    /// Apply to a posted job at `proposed_rate`.
    pub async fn submit_application(
        &self,
        job_id: JobId,
        actor: &Actor,
        proposed_rate: f64,
    ) -> Result<Application, LifecycleError> {
        if !actor.role.can_apply() {
            return Err(LifecycleError::unauthorized(
                ErrorCode::RoleNotPermitted,
                "only freelancers can apply to jobs",
            ));
        }
        let rate = Rate::from_amount(proposed_rate)
            .map_err(|err| LifecycleError::validation("proposed_rate", err.to_string()))?;

        let job = self.load_job(job_id).await?;
        self.machine
            .next(job.status, JobEvent::SubmitApplication)
            .map_err(job_not_open)?;
        if job.is_owned_by(actor.actor_id) {
            return Err(LifecycleError::unauthorized(
                ErrorCode::RoleNotPermitted,
                "cannot apply to your own job",
            ));
        }

        if !self.policy.allow_duplicate_applications {
            let existing = self
                .applications
                .find(&ApplicationFilter::for_job(job_id).with_freelancer(actor.actor_id))
                .await?;
            if existing
                .iter()
                .any(|application| application.status != ApplicationStatus::Rejected)
            {
                return Err(LifecycleError::conflict(
                    ErrorCode::DuplicateApplication,
                    "you have already applied to this job",
                ));
            }
        }

        let application = self
            .applications
            .insert(Application::pending(
                job_id,
                actor.actor_id,
                rate,
                self.clock.now(),
            ))
            .await?;

        // A selection may have landed between the status check and the insert.
        let refusal = match self.jobs.fetch(job_id).await {
            Ok(Some(current)) if current.status == JobStatus::Posted => None,
            Ok(Some(current)) => Some(job_not_open(TransitionError::NotOpen(current.status))),
            Ok(None) => Some(LifecycleError::job_not_found()),
            Err(err) => Some(err.into()),
        };
        if let Some(refusal) = refusal {
            return match self.withdraw(&application).await {
                Some(decided) => {
                    info!(
                        job_id = %job_id,
                        application_id = %decided.id,
                        status = %decided.status,
                        "late application was decided before withdrawal"
                    );
                    Ok(decided)
                }
                None => Err(refusal),
            };
        }

        info!(
            job_id = %job_id,
            application_id = %application.id,
            freelancer_id = %actor.actor_id,
            rate = %rate,
            "application submitted"
        );
        self.events
            .dispatch(DomainEvent::application_received(&job, &application))
            .await;
        Ok(application)
    }

    /// Select one pending application. The job leaves `posted` first so at
    /// most one selection can ever win.
    pub async fn accept_application(
        &self,
        job_id: JobId,
        application_id: ApplicationId,
        actor: &Actor,
    ) -> Result<Acceptance, LifecycleError> {
        let job = self.load_owned_job(job_id, actor).await?;
        let next = self.machine.next(job.status, JobEvent::AcceptApplication)?;
        let application = self.load_application(job_id, application_id).await?;
        application.status.decide(Decision::Accept)?;

        let claimed = self
            .jobs
            .update_status(job_id, JobStatus::Posted, StatusChange::to(next))
            .await?;
        if claimed != 1 {
            return Err(LifecycleError::conflict(
                ErrorCode::JobStateChanged,
                "job is no longer accepting selections",
            ));
        }

        let accepted = match self
            .applications
            .update_status(
                &ApplicationFilter::by_id(application_id),
                ApplicationStatus::Pending,
                ApplicationStatus::Accepted,
            )
            .await
        {
            Ok(mut changed) if !changed.is_empty() => changed.remove(0),
            Ok(_) => {
                self.release_job(job_id).await;
                return Err(LifecycleError::not_found(
                    ErrorCode::ApplicationNotPending,
                    "application is no longer pending",
                ));
            }
            Err(err) => {
                self.release_job(job_id).await;
                return Err(err.into());
            }
        };

        let auto_rejected = match self
            .applications
            .update_status(
                &ApplicationFilter::for_job(job_id).excluding(application_id),
                ApplicationStatus::Pending,
                ApplicationStatus::Rejected,
            )
            .await
        {
            Ok(changed) => changed,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "failed to close competing applications");
                Vec::new()
            }
        };

        let job = Job { status: next, ..job };
        if let Err(err) = self
            .transactions
            .insert(TransactionRecord::placeholder(&job, &accepted))
            .await
        {
            warn!(job_id = %job_id, error = %err, "failed to record payment placeholder");
        }

        info!(
            job_id = %job_id,
            application_id = %application_id,
            freelancer_id = %accepted.freelancer_id,
            auto_rejected = auto_rejected.len(),
            "application accepted"
        );

        let mut events = vec![DomainEvent::application_accepted(&job, &accepted)];
        events.extend(
            auto_rejected
                .iter()
                .map(|application| DomainEvent::application_rejected(&job, application)),
        );
        self.events.dispatch_all(events).await;

        Ok(Acceptance {
            job,
            application: accepted,
            auto_rejected,
        })
    }

    /// Turn down a single pending application.
    pub async fn reject_application(
        &self,
        job_id: JobId,
        application_id: ApplicationId,
        actor: &Actor,
    ) -> Result<Application, LifecycleError> {
        let job = self.load_owned_job(job_id, actor).await?;
        self.machine.next(job.status, JobEvent::RejectApplication)?;
        let application = self.load_application(job_id, application_id).await?;
        application.status.decide(Decision::Reject)?;

        let rejected = self
            .applications
            .update_status(
                &ApplicationFilter::by_id(application_id),
                ApplicationStatus::Pending,
                ApplicationStatus::Rejected,
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LifecycleError::not_found(
                    ErrorCode::ApplicationNotPending,
                    "application is no longer pending",
                )
            })?;

        info!(job_id = %job_id, application_id = %application_id, "application rejected");
        self.events
            .dispatch(DomainEvent::application_rejected(&job, &rejected))
            .await;
        Ok(rejected)
    }

    /// Close an in-progress job and schedule it for archiving.
    pub async fn complete_job(&self, job_id: JobId, actor: &Actor) -> Result<Job, LifecycleError> {
        let job = self.load_managed_job(job_id, actor).await?;
        let next = self.machine.next(job.status, JobEvent::Complete)?;

        let now = self.clock.now();
        let change = StatusChange {
            to: next,
            completed_at: Some(now),
            archive_at: Some(now + Duration::hours(ARCHIVE_AFTER_HOURS)),
        };
        if self.jobs.update_status(job_id, job.status, change).await? != 1 {
            return Err(LifecycleError::conflict(
                ErrorCode::JobStateChanged,
                "job changed while completing it",
            ));
        }
        let job = Job {
            status: next,
            completed_at: change.completed_at,
            archive_at: change.archive_at,
            ..job
        };

        let freelancer = match self.accepted_application(job_id).await {
            Ok(application) => application.map(|application| application.freelancer_id),
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "failed to look up accepted freelancer");
                None
            }
        };

        info!(job_id = %job_id, freelancer_id = ?freelancer, "job completed");
        let mut events = vec![DomainEvent::job_completed(&job, job.client_id, freelancer)];
        if let Some(freelancer) = freelancer {
            events.push(DomainEvent::job_completed(&job, freelancer, Some(job.client_id)));
        }
        self.events.dispatch_all(events).await;
        Ok(job)
    }

    /// Cancel a job that has not completed and remove it with its applications.
    pub async fn delete_job(&self, job_id: JobId, actor: &Actor) -> Result<DeletedJob, LifecycleError> {
        let job = self.load_managed_job(job_id, actor).await?;
        let next = self.machine.next(job.status, JobEvent::Delete)?;

        if self.jobs.delete(job_id, job.status).await? != 1 {
            return Err(LifecycleError::conflict(
                ErrorCode::JobStateChanged,
                "job changed while deleting it",
            ));
        }

        let removed_applications = match self
            .applications
            .delete(&ApplicationFilter::for_job(job_id))
            .await
        {
            Ok(removed) => removed,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "failed to remove applications of deleted job");
                0
            }
        };

        info!(
            job_id = %job_id,
            previous_status = %job.status,
            removed_applications,
            "job deleted"
        );
        Ok(DeletedJob {
            job_id,
            previous_status: job.status,
            status: next,
            removed_applications,
        })
    }

    /// Edit a job's fields while it is still open.
    pub async fn update_job(
        &self,
        job_id: JobId,
        actor: &Actor,
        patch: JobPatch,
    ) -> Result<Job, LifecycleError> {
        let job = self.load_managed_job(job_id, actor).await?;
        self.machine.next(job.status, JobEvent::Edit)?;
        if patch.is_empty() {
            return Err(LifecycleError::validation("job", "no fields to update"));
        }

        let fields = validate_job_fields(patch.merge_into(job.fields()))?;
        if self
            .jobs
            .update_fields(job_id, JobStatus::Posted, fields.clone())
            .await?
            != 1
        {
            return Err(LifecycleError::conflict(
                ErrorCode::JobStateChanged,
                "job is no longer open for edits",
            ));
        }

        info!(job_id = %job_id, "job updated");
        Ok(Job {
            title: fields.title,
            description: fields.description,
            location: fields.location,
            timeline: fields.timeline,
            ..job
        })
    }

    /// Charge the client for the accepted rate and settle the transaction.
    pub async fn process_payment(
        &self,
        job_id: JobId,
        actor: &Actor,
        method: String,
    ) -> Result<PaymentOutcome, LifecycleError> {
        let job = self.load_owned_job(job_id, actor).await?;
        if job.status != JobStatus::InProgress {
            return Err(TransitionError::NotInProgress(job.status).into());
        }
        let accepted = self.accepted_application(job_id).await?.ok_or_else(|| {
            LifecycleError::conflict(
                ErrorCode::NoAcceptedApplication,
                "no accepted application found for this job",
            )
        })?;

        let receipt = self
            .payments
            .charge(PaymentRequest {
                job_id,
                client_id: job.client_id,
                freelancer_id: accepted.freelancer_id,
                amount: accepted.proposed_rate,
                method,
            })
            .await
            .map_err(|err| LifecycleError::Dependency(err.to_string()))?;

        // The charge went through; settlement bookkeeping failures are logged
        // so the caller never retries a successful charge.
        match self
            .transactions
            .mark_paid(job_id, receipt.reference.clone(), receipt.processed_at)
            .await
        {
            Ok(0) => {
                let mut record = TransactionRecord::placeholder(&job, &accepted);
                record.payment_status = PaymentStatus::Completed;
                record.payment_reference = Some(receipt.reference.clone());
                record.payment_date = Some(receipt.processed_at);
                if let Err(err) = self.transactions.insert(record).await {
                    warn!(job_id = %job_id, error = %err, "failed to record settled payment");
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "failed to mark transaction paid");
            }
        }

        info!(job_id = %job_id, reference = %receipt.reference, "payment processed");
        Ok(PaymentOutcome {
            job_id,
            amount: accepted.proposed_rate,
            payment_reference: receipt.reference,
            payment_status: PaymentStatus::Completed,
            payment_date: receipt.processed_at,
        })
    }

    pub(super) async fn load_job(&self, job_id: JobId) -> Result<Job, LifecycleError> {
        self.jobs
            .fetch(job_id)
            .await?
            .ok_or_else(LifecycleError::job_not_found)
    }

    async fn load_owned_job(&self, job_id: JobId, actor: &Actor) -> Result<Job, LifecycleError> {
        let job = self.load_job(job_id).await?;
        if !job.is_owned_by(actor.actor_id) {
            return Err(LifecycleError::not_owner());
        }
        Ok(job)
    }

    /// Owner check that also admits administrators.
    async fn load_managed_job(&self, job_id: JobId, actor: &Actor) -> Result<Job, LifecycleError> {
        let job = self.load_job(job_id).await?;
        if !job.is_owned_by(actor.actor_id) && !actor.is_admin {
            return Err(LifecycleError::not_owner());
        }
        Ok(job)
    }

    async fn load_application(
        &self,
        job_id: JobId,
        application_id: ApplicationId,
    ) -> Result<Application, LifecycleError> {
        self.applications
            .fetch(application_id)
            .await?
            .filter(|application| application.job_id == job_id)
            .ok_or_else(|| {
                LifecycleError::not_found(
                    ErrorCode::ApplicationNotFound,
                    "application not found for this job",
                )
            })
    }

    pub(super) async fn accepted_application(
        &self,
        job_id: JobId,
    ) -> Result<Option<Application>, LifecycleError> {
        Ok(self
            .applications
            .find(&ApplicationFilter::for_job(job_id).with_status(ApplicationStatus::Accepted))
            .await?
            .into_iter()
            .next())
    }

    /// Undo the job claim of a selection whose application flip failed.
    async fn release_job(&self, job_id: JobId) {
        match self
            .jobs
            .update_status(job_id, JobStatus::InProgress, StatusChange::to(JobStatus::Posted))
            .await
        {
            Ok(1) => info!(job_id = %job_id, "selection rolled back"),
            Ok(_) => warn!(job_id = %job_id, "selection rollback found job already moved"),
            Err(err) => warn!(job_id = %job_id, error = %err, "selection rollback failed"),
        }
    }

    /// Remove a late application while it is still pending. When the owner
    /// (or the selection cascade) decided it first, the decided row is kept
    /// and returned.
    async fn withdraw(&self, application: &Application) -> Option<Application> {
        let pending = ApplicationFilter::by_id(application.id).with_status(ApplicationStatus::Pending);
        match self.applications.delete(&pending).await {
            Ok(0) => match self.applications.fetch(application.id).await {
                Ok(decided) => decided,
                Err(err) => {
                    warn!(application_id = %application.id, error = %err, "failed to reload late application");
                    None
                }
            },
            Ok(_) => None,
            Err(err) => {
                warn!(application_id = %application.id, error = %err, "failed to withdraw late application");
                None
            }
        }
    }
}

/// Applications to a job that is gone or no longer posted read as missing.
fn job_not_open(err: TransitionError) -> LifecycleError {
    LifecycleError::not_found(ErrorCode::JobNotOpen, err.to_string())
}

