use std::num::NonZeroU32;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{report_router, ReportService, ReportStatus, ReportSubmission, ReportType};
use crate::auth::ACTOR_ID_HEADER;
use crate::config::RateLimitConfig;
use crate::jobs::{
    Actor, Collaborators, ErrorCode, Job, JobFields, JobId, JobRepository, LifecycleError,
    MemoryStore, UserId,
};
use crate::notifications::NotificationCenter;
use crate::rate_limit::browse_limiter;

struct Fixture {
    store: Arc<MemoryStore>,
    reports: Arc<ReportService>,
    reporter: Actor,
    offender: Actor,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let collaborators =
        Collaborators::in_memory(store.clone(), Arc::new(NotificationCenter::default()));
    Fixture {
        store,
        reports: Arc::new(ReportService::new(&collaborators)),
        reporter: Actor::client(UserId::new()),
        offender: Actor::freelancer(UserId::new()),
    }
}

fn submission(reported: &Actor) -> ReportSubmission {
    ReportSubmission {
        reported_user_id: reported.actor_id,
        report_type: "harassment".to_string(),
        description: "  Sent abusive messages after the quote was declined. ".to_string(),
        job_id: None,
        chat_id: None,
    }
}

impl Fixture {
    async fn job(&self) -> Job {
        let job = Job::posted(
            self.reporter.actor_id,
            JobFields {
                title: "Clean gutters".to_string(),
                description: "Single storey house, gutters on two sides.".to_string(),
                location: "Durban North".to_string(),
                timeline: None,
            },
            chrono::Utc::now(),
        );
        JobRepository::insert(self.store.as_ref(), job)
            .await
            .expect("job stored")
    }
}

#[tokio::test]
async fn reports_are_filed_pending() {
    let f = fixture();
    let job = f.job().await;
    let mut body = submission(&f.offender);
    body.job_id = Some(job.id);
    body.chat_id = Some(" conv-42 ".to_string());

    let report = f.reports.file(&f.reporter, body).await.expect("filed");

    assert_eq!(report.status, ReportStatus::Pending);
    assert_eq!(report.report_type, ReportType::Harassment);
    assert_eq!(report.reporter_id, f.reporter.actor_id);
    assert_eq!(
        report.description,
        "Sent abusive messages after the quote was declined."
    );
    assert_eq!(report.job_id, Some(job.id));
    assert_eq!(report.chat_id.as_deref(), Some("conv-42"));
    assert_eq!(f.store.reports().expect("reports"), vec![report]);
}

#[tokio::test]
async fn invalid_reports_name_the_field() {
    let f = fixture();

    let mut unknown = submission(&f.offender);
    unknown.report_type = "rude".to_string();
    let err = f.reports.file(&f.reporter, unknown).await.expect_err("bad type");
    assert!(matches!(err, LifecycleError::Validation { field: "report_type", .. }));

    let mut blank = submission(&f.offender);
    blank.description = "   ".to_string();
    let err = f.reports.file(&f.reporter, blank).await.expect_err("blank");
    assert!(matches!(err, LifecycleError::Validation { field: "description", .. }));

    let err = f
        .reports
        .file(&f.reporter, submission(&f.reporter))
        .await
        .expect_err("self report");
    assert!(matches!(
        err,
        LifecycleError::Validation {
            field: "reported_user_id",
            ..
        }
    ));

    let mut missing_job = submission(&f.offender);
    missing_job.job_id = Some(JobId::new());
    let err = f
        .reports
        .file(&f.reporter, missing_job)
        .await
        .expect_err("unknown job");
    assert_eq!(err.code(), ErrorCode::JobNotFound);

    assert!(f.store.reports().expect("reports").is_empty());
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn reports_over_http_share_the_rate_budget() {
    let f = fixture();
    let limiter = browse_limiter(&RateLimitConfig {
        per_minute: NonZeroU32::new(1).expect("non-zero"),
        trust_forwarded_for: false,
    });
    let app = report_router(f.reports.clone(), limiter);
    let post = || {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/reports")
            .header(ACTOR_ID_HEADER, f.reporter.actor_id.to_string())
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "reported_user_id": f.offender.actor_id,
                    "report_type": "spam",
                    "description": "Posts the same advert on every job."
                })
                .to_string(),
            ))
            .expect("request")
    };

    let created = app.clone().oneshot(post()).await.expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json(created).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["report_type"], "spam");

    let limited = app.oneshot(post()).await.expect("response");
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
}
