use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{Application, ApplicationId, Job, JobId, Rate, UserId};

/// Transition that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobPosted,
    JobApplicationReceived,
    ApplicationAccepted,
    ApplicationRejected,
    JobCompleted,
}

impl EventKind {
    pub const fn label(self) -> &'static str {
        match self {
            EventKind::JobPosted => "job_posted",
            EventKind::JobApplicationReceived => "job_application_received",
            EventKind::ApplicationAccepted => "application_accepted",
            EventKind::ApplicationRejected => "application_rejected",
            EventKind::JobCompleted => "job_completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub job_id: JobId,
    pub job_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    /// The other party of the transition: the applicant for a client, the
    /// client for a freelancer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
}

/// A lifecycle transition addressed to one user.
///
/// `JobPosted` is addressed to the poster; publishers widen it to the
/// freelancers who asked for job alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub kind: EventKind,
    pub target: UserId,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn job_posted(job: &Job) -> Self {
        Self {
            kind: EventKind::JobPosted,
            target: job.client_id,
            payload: EventPayload::for_job(job),
        }
    }

    pub fn application_received(job: &Job, application: &Application) -> Self {
        Self {
            kind: EventKind::JobApplicationReceived,
            target: job.client_id,
            payload: EventPayload::for_application(job, application, application.freelancer_id),
        }
    }

    pub fn application_accepted(job: &Job, application: &Application) -> Self {
        Self {
            kind: EventKind::ApplicationAccepted,
            target: application.freelancer_id,
            payload: EventPayload::for_application(job, application, job.client_id),
        }
    }

    pub fn application_rejected(job: &Job, application: &Application) -> Self {
        Self {
            kind: EventKind::ApplicationRejected,
            target: application.freelancer_id,
            payload: EventPayload::for_application(job, application, job.client_id),
        }
    }

    pub fn job_completed(job: &Job, recipient: UserId, counterparty: Option<UserId>) -> Self {
        let mut payload = EventPayload::for_job(job);
        payload.counterparty_id = counterparty;
        Self {
            kind: EventKind::JobCompleted,
            target: recipient,
            payload,
        }
    }
}

impl EventPayload {
    fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            job_title: job.title.clone(),
            application_id: None,
            counterparty_id: None,
            rate: None,
        }
    }

    fn for_application(job: &Job, application: &Application, counterparty: UserId) -> Self {
        Self {
            job_id: job.id,
            job_title: job.title.clone(),
            application_id: Some(application.id),
            counterparty_id: Some(counterparty),
            rate: Some(application.proposed_rate),
        }
    }
}

/// Abstraction over the notification fan-out.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Retry budget for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Total tries per event, at least one.
    pub attempts: u32,
    /// Pause between tries, doubled after each failure.
    pub backoff: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Hands events to the publisher and swallows whatever goes wrong.
///
/// A committed transition is never reported as failed because a notification
/// could not be delivered.
#[derive(Clone)]
pub struct EventDispatcher {
    publisher: Arc<dyn EventPublisher>,
    policy: DispatchPolicy,
}

impl EventDispatcher {
    pub fn new(publisher: Arc<dyn EventPublisher>, policy: DispatchPolicy) -> Self {
        Self { publisher, policy }
    }

    /// Deliver one event. Returns whether the publisher took it.
    pub async fn dispatch(&self, event: DomainEvent) -> bool {
        let attempts = self.policy.attempts.max(1);
        let mut backoff = self.policy.backoff;

        for attempt in 1..=attempts {
            match self.publisher.publish(event.clone()).await {
                Ok(()) => {
                    debug!(
                        kind = event.kind.label(),
                        target = %event.target,
                        job_id = %event.payload.job_id,
                        "event published"
                    );
                    return true;
                }
                Err(err) if attempt < attempts => {
                    debug!(kind = event.kind.label(), attempt, error = %err, "retrying event");
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                        backoff = backoff.saturating_mul(2);
                    }
                }
                Err(err) => {
                    warn!(
                        kind = event.kind.label(),
                        target = %event.target,
                        job_id = %event.payload.job_id,
                        attempts,
                        error = %err,
                        "dropping event after failed delivery"
                    );
                }
            }
        }
        false
    }

    /// Deliver events in order. Returns how many the publisher took.
    pub async fn dispatch_all(&self, events: impl IntoIterator<Item = DomainEvent>) -> usize {
        let mut delivered = 0;
        for event in events {
            if self.dispatch(event).await {
                delivered += 1;
            }
        }
        delivered
    }
}
