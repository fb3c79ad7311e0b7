use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::config::RateLimitConfig;
use crate::jobs::domain::{Actor, Application, Job, JobFields, JobId, TransactionRecord, UserId};
use crate::jobs::events::{DispatchPolicy, DomainEvent, EventKind, EventPublisher, PublishError};
use crate::jobs::repository::{RepositoryError, TransactionRepository};
use crate::jobs::{job_router, ApplicationPolicy, Collaborators, JobLifecycleService, MemoryStore};
use crate::rate_limit::browse_limiter;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn quick_dispatch() -> DispatchPolicy {
    DispatchPolicy {
        attempts: 1,
        backoff: Duration::ZERO,
    }
}

pub(super) fn faucet_fields() -> JobFields {
    JobFields {
        title: "Fix leaky faucet".to_string(),
        description: "Kitchen tap drips all night and needs a new washer.".to_string(),
        location: "Cape Town".to_string(),
        timeline: Some("This week".to_string()),
    }
}

pub(super) fn client() -> Actor {
    Actor::client(UserId::new())
}

pub(super) fn freelancer() -> Actor {
    Actor::freelancer(UserId::new())
}

#[derive(Default)]
pub(super) struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub(super) fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().expect("publisher mutex poisoned").clone()
    }

    pub(super) fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|event| event.kind).collect()
    }

    pub(super) fn clear(&self) {
        self.events.lock().expect("publisher mutex poisoned").clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: DomainEvent) -> Result<(), PublishError> {
        Err(PublishError::Transport("broker offline".to_string()))
    }
}

pub(super) struct UnavailableTransactions;

#[async_trait]
impl TransactionRepository for UnavailableTransactions {
    async fn insert(
        &self,
        _record: TransactionRecord,
    ) -> Result<TransactionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }

    async fn mark_paid(
        &self,
        _job_id: JobId,
        _reference: String,
        _paid_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<JobLifecycleService>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) events: Arc<RecordingPublisher>,
}

impl Harness {
    pub(super) async fn post_job(&self, owner: &Actor) -> Job {
        self.service
            .create_job(owner, faucet_fields())
            .await
            .expect("job posts")
    }

    pub(super) async fn apply(&self, job: &Job, applicant: &Actor, rate: f64) -> Application {
        self.service
            .submit_application(job.id, applicant, rate)
            .await
            .expect("application submits")
    }

    pub(super) async fn job(&self, job_id: JobId) -> Option<Job> {
        crate::jobs::JobRepository::fetch(self.store.as_ref(), job_id)
            .await
            .expect("store reads")
    }

    pub(super) async fn application(&self, application: &Application) -> Application {
        crate::jobs::ApplicationRepository::fetch(self.store.as_ref(), application.id)
            .await
            .expect("store reads")
            .expect("application exists")
    }
}

pub(super) fn harness() -> Harness {
    harness_with(ApplicationPolicy::default())
}

pub(super) fn harness_with(policy: ApplicationPolicy) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(RecordingPublisher::default());
    let collaborators = Collaborators::in_memory(store.clone(), events.clone())
        .with_clock(Arc::new(FixedClock(now())));
    let service = Arc::new(JobLifecycleService::new(
        collaborators,
        policy,
        quick_dispatch(),
    ));
    Harness {
        service,
        store,
        events,
    }
}

pub(super) fn router_for(harness: &Harness, per_minute: u32) -> axum::Router {
    let limiter = browse_limiter(&RateLimitConfig {
        per_minute: std::num::NonZeroU32::new(per_minute).expect("non-zero"),
        trust_forwarded_for: false,
    });
    job_router(harness.service.clone(), limiter)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
