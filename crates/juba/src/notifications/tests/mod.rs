use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{TimeZone, Utc};
use tower::ServiceExt;

use super::{notification_router, render, NotificationCenter};
use crate::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::clock::FixedClock;
use crate::jobs::{
    Actor, ApplicationPolicy, Collaborators, DispatchPolicy, DomainEvent, ErrorCode, EventKind,
    EventPublisher, JobFields, JobLifecycleService, MemoryStore, UserId,
};

fn center() -> Arc<NotificationCenter> {
    let at = Utc
        .with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp");
    Arc::new(NotificationCenter::new(Arc::new(FixedClock(at))))
}

fn lifecycle(center: Arc<NotificationCenter>) -> JobLifecycleService {
    JobLifecycleService::new(
        Collaborators::in_memory(Arc::new(MemoryStore::new()), center),
        ApplicationPolicy::default(),
        DispatchPolicy {
            attempts: 1,
            backoff: Duration::ZERO,
        },
    )
}

fn fields() -> JobFields {
    JobFields {
        title: "Garden cleanup".to_string(),
        description: "Trim hedges and clear leaves from the back garden.".to_string(),
        location: "Durban North".to_string(),
        timeline: Some("Saturday".to_string()),
    }
}

#[tokio::test]
async fn new_jobs_reach_alert_subscribers_except_the_poster() {
    let center = center();
    let service = lifecycle(center.clone());
    let poster = Actor::new(UserId::new(), crate::jobs::ActorRole::Both);
    let watcher = UserId::new();
    center.register_for_job_alerts(watcher).expect("register");
    center
        .register_for_job_alerts(poster.actor_id)
        .expect("register");
    let bystander = UserId::new();

    service.create_job(&poster, fields()).await.expect("post");

    let inbox = center.list(watcher, 20, 0).expect("list");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, EventKind::JobPosted);
    assert_eq!(inbox[0].title, "New Job Available");
    assert!(inbox[0].message.contains("Garden cleanup"));
    assert!(center.list(poster.actor_id, 20, 0).expect("list").is_empty());
    assert!(center.list(bystander, 20, 0).expect("list").is_empty());

    center.unregister_from_job_alerts(watcher).expect("unregister");
    service.create_job(&poster, fields()).await.expect("post");
    assert_eq!(center.unread_count(watcher).expect("count"), 1);
}

#[tokio::test]
async fn selection_notifies_winner_and_losers() {
    let center = center();
    let service = lifecycle(center.clone());
    let owner = Actor::client(UserId::new());
    let winner = Actor::freelancer(UserId::new());
    let loser = Actor::freelancer(UserId::new());
    let job = service.create_job(&owner, fields()).await.expect("post");
    let chosen = service
        .submit_application(job.id, &winner, 400.0)
        .await
        .expect("apply");
    service
        .submit_application(job.id, &loser, 350.0)
        .await
        .expect("apply");

    let owner_inbox = center.list(owner.actor_id, 20, 0).expect("list");
    assert_eq!(owner_inbox.len(), 2);
    assert!(owner_inbox
        .iter()
        .all(|notification| notification.title == "New Job Application"));

    service
        .accept_application(job.id, chosen.id, &owner)
        .await
        .expect("accept");

    let won = center.list(winner.actor_id, 20, 0).expect("list");
    assert_eq!(won.len(), 1);
    assert_eq!(won[0].title, "Application Approved!");
    assert_eq!(won[0].data["job_id"], job.id.to_string());
    let lost = center.list(loser.actor_id, 20, 0).expect("list");
    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].title, "Application Not Selected");
}

#[tokio::test]
async fn inbox_reads_and_deletes_are_scoped_to_the_owner() {
    let center = center();
    let user = UserId::new();
    let other = UserId::new();
    let job = crate::jobs::Job::posted(other, fields(), Utc::now());
    for _ in 0..3 {
        center
            .publish(DomainEvent::job_completed(&job, user, None))
            .await
            .expect("publish");
    }

    let inbox = center.list(user, 20, 0).expect("list");
    assert_eq!(inbox.len(), 3);
    assert_eq!(center.list(user, 2, 2).expect("page").len(), 1);

    let first = inbox[0].id;
    assert_eq!(center.mark_read(user, Some(&[first][..])).expect("mark"), 1);
    assert_eq!(center.mark_read(other, None).expect("mark"), 0);
    assert_eq!(center.unread_count(user).expect("count"), 2);
    assert_eq!(center.mark_read(user, None).expect("mark all"), 2);
    assert_eq!(center.unread_count(user).expect("count"), 0);
    let read = center.list(user, 1, 0).expect("list");
    assert!(read[0].read_at.is_some());

    let err = center.delete(other, first).expect_err("not theirs");
    assert_eq!(err.code(), ErrorCode::NotificationNotFound);
    center.delete(user, first).expect("delete");
    assert_eq!(center.list(user, 20, 0).expect("list").len(), 2);
}

#[tokio::test]
async fn live_subscribers_receive_stored_notifications() {
    let center = center();
    let mut live = center.subscribe();
    let user = UserId::new();
    let job = crate::jobs::Job::posted(UserId::new(), fields(), Utc::now());

    center
        .publish(DomainEvent::job_completed(&job, user, None))
        .await
        .expect("publish");

    let received = live.recv().await.expect("broadcast");
    assert_eq!(received.user_id, user);
    assert_eq!(received.kind, EventKind::JobCompleted);
}

#[test]
fn render_uses_the_job_title() {
    let job = crate::jobs::Job::posted(UserId::new(), fields(), Utc::now());
    let (title, message) = render(&DomainEvent::job_completed(&job, UserId::new(), None));
    assert_eq!(title, "Job Completed");
    assert_eq!(message, "The job \"Garden cleanup\" has been marked as completed");
}

#[tokio::test]
async fn job_alert_subscription_requires_freelancer_capacity() {
    let app = notification_router(center());
    let request = |role: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/notifications/subscriptions")
            .header(ACTOR_ID_HEADER, UserId::new().to_string())
            .header(ACTOR_ROLE_HEADER, role)
            .body(Body::empty())
            .expect("request")
    };

    let refused = app
        .clone()
        .oneshot(request("client"))
        .await
        .expect("response");
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let accepted = app.oneshot(request("freelancer")).await.expect("response");
    assert_eq!(accepted.status(), StatusCode::OK);
}

#[tokio::test]
async fn unread_count_over_http() {
    let center = center();
    let user = UserId::new();
    let job = crate::jobs::Job::posted(UserId::new(), fields(), Utc::now());
    center
        .publish(DomainEvent::job_completed(&job, user, None))
        .await
        .expect("publish");

    let response = notification_router(center)
        .oneshot(
            Request::builder()
                .uri("/api/v1/notifications/unread-count")
                .header(ACTOR_ID_HEADER, user.to_string())
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .expect("read body");
    let body: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(body["unread"], 1);
}
