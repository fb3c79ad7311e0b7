use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::jobs::domain::uuid_id;
use crate::jobs::{
    DomainEvent, ErrorCode, EventKind, EventPublisher, LifecycleError, PublishError, UserId,
};

uuid_id!(
    /// Identifier of a stored notification.
    NotificationId
);

/// Capacity of the real-time channel; slow subscribers skip older messages.
pub const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: EventKind,
    pub title: String,
    pub message: String,
    pub data: Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

/// Title and body shown to the recipient of `event`.
pub fn render(event: &DomainEvent) -> (&'static str, String) {
    let title = &event.payload.job_title;
    match event.kind {
        EventKind::JobPosted => (
            "New Job Available",
            format!("A new job \"{title}\" has been posted"),
        ),
        EventKind::JobApplicationReceived => (
            "New Job Application",
            match event.payload.rate {
                Some(rate) => format!("A freelancer applied for your job \"{title}\" at {rate}"),
                None => format!("A freelancer applied for your job \"{title}\""),
            },
        ),
        EventKind::ApplicationAccepted => (
            "Application Approved!",
            format!("Your application for \"{title}\" has been approved"),
        ),
        EventKind::ApplicationRejected => (
            "Application Not Selected",
            format!("Your application for \"{title}\" was not selected this time"),
        ),
        EventKind::JobCompleted => (
            "Job Completed",
            format!("The job \"{title}\" has been marked as completed"),
        ),
    }
}

/// Stores notifications per user and mirrors each one onto a broadcast
/// channel for real-time delivery.
pub struct NotificationCenter {
    inbox: Mutex<Vec<Notification>>,
    job_alerts: Mutex<HashSet<UserId>>,
    sender: broadcast::Sender<Notification>,
    clock: Arc<dyn Clock>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl NotificationCenter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inbox: Mutex::new(Vec::new()),
            job_alerts: Mutex::new(HashSet::new()),
            sender,
            clock,
        }
    }

    /// Receive every notification stored from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Opt a freelancer into new-job alerts.
    pub fn register_for_job_alerts(&self, user_id: UserId) -> Result<bool, LifecycleError> {
        Ok(lock(&self.job_alerts).map_err(unavailable)?.insert(user_id))
    }

    pub fn unregister_from_job_alerts(&self, user_id: UserId) -> Result<bool, LifecycleError> {
        Ok(lock(&self.job_alerts).map_err(unavailable)?.remove(&user_id))
    }

    /// A page of the user's notifications, newest first.
    pub fn list(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Notification>, LifecycleError> {
        let inbox = lock(&self.inbox).map_err(unavailable)?;
        Ok(inbox
            .iter()
            .rev()
            .filter(|notification| notification.user_id == user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    pub fn unread_count(&self, user_id: UserId) -> Result<usize, LifecycleError> {
        let inbox = lock(&self.inbox).map_err(unavailable)?;
        Ok(inbox
            .iter()
            .filter(|notification| notification.user_id == user_id && !notification.read)
            .count())
    }

    /// Mark the given notifications read, or all of them when `ids` is `None`.
    /// Returns how many changed.
    pub fn mark_read(
        &self,
        user_id: UserId,
        ids: Option<&[NotificationId]>,
    ) -> Result<usize, LifecycleError> {
        let now = self.clock.now();
        let mut inbox = lock(&self.inbox).map_err(unavailable)?;
        let mut changed = 0;
        for notification in inbox.iter_mut().filter(|notification| {
            notification.user_id == user_id
                && !notification.read
                && ids.map_or(true, |ids| ids.contains(&notification.id))
        }) {
            notification.read = true;
            notification.read_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }

    pub fn delete(&self, user_id: UserId, id: NotificationId) -> Result<(), LifecycleError> {
        let mut inbox = lock(&self.inbox).map_err(unavailable)?;
        let before = inbox.len();
        inbox.retain(|notification| !(notification.id == id && notification.user_id == user_id));
        if inbox.len() == before {
            return Err(LifecycleError::not_found(
                ErrorCode::NotificationNotFound,
                "notification not found",
            ));
        }
        Ok(())
    }

    fn recipients(&self, event: &DomainEvent) -> Result<Vec<UserId>, PublishError> {
        if event.kind != EventKind::JobPosted {
            return Ok(vec![event.target]);
        }
        let alerts = lock(&self.job_alerts).map_err(PublishError::Transport)?;
        let mut recipients: Vec<UserId> = alerts
            .iter()
            .copied()
            .filter(|user| *user != event.target)
            .collect();
        recipients.sort();
        Ok(recipients)
    }
}

#[async_trait]
impl EventPublisher for NotificationCenter {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let recipients = self.recipients(&event)?;
        let (title, message) = render(&event);
        let data = serde_json::to_value(&event.payload).unwrap_or_else(|_| json!({}));
        let created_at = self.clock.now();

        let notifications: Vec<Notification> = recipients
            .into_iter()
            .map(|user_id| Notification {
                id: NotificationId::new(),
                user_id,
                kind: event.kind,
                title: title.to_string(),
                message: message.clone(),
                data: data.clone(),
                read: false,
                created_at,
                read_at: None,
            })
            .collect();

        lock(&self.inbox)
            .map_err(PublishError::Transport)?
            .extend(notifications.iter().cloned());

        for notification in notifications {
            // No live subscribers is not a failure; the inbox already has it.
            if self.sender.send(notification).is_err() {
                debug!(kind = event.kind.label(), "no realtime subscribers");
            }
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex
        .lock()
        .map_err(|_| "notification store lock poisoned".to_string())
}

fn unavailable(message: String) -> LifecycleError {
    LifecycleError::Dependency(message)
}
