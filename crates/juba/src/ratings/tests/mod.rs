use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{rating_router, RatingEdit, RatingId, RatingService, RatingSubmission};
use crate::auth::ACTOR_ID_HEADER;
use crate::jobs::{
    Actor, ApplicationPolicy, Collaborators, DispatchPolicy, ErrorCode, Job, JobFields,
    JobLifecycleService, LifecycleError, MemoryStore, UserId,
};
use crate::notifications::NotificationCenter;

struct Fixture {
    lifecycle: JobLifecycleService,
    ratings: Arc<RatingService>,
    client: Actor,
    freelancer: Actor,
}

fn fixture() -> Fixture {
    let collaborators = Collaborators::in_memory(
        Arc::new(MemoryStore::new()),
        Arc::new(NotificationCenter::default()),
    );
    Fixture {
        ratings: Arc::new(RatingService::new(&collaborators)),
        lifecycle: JobLifecycleService::new(
            collaborators,
            ApplicationPolicy::default(),
            DispatchPolicy {
                attempts: 1,
                backoff: Duration::ZERO,
            },
        ),
        client: Actor::client(UserId::new()),
        freelancer: Actor::freelancer(UserId::new()),
    }
}

fn fields() -> JobFields {
    JobFields {
        title: "Assemble bookshelf".to_string(),
        description: "Flat-pack bookshelf with two shelves and a back panel.".to_string(),
        location: "Johannesburg".to_string(),
        timeline: None,
    }
}

impl Fixture {
    /// Post, hire, and optionally complete one job.
    async fn hired_job(&self, complete: bool) -> Job {
        let job = self
            .lifecycle
            .create_job(&self.client, fields())
            .await
            .expect("post");
        let bid = self
            .lifecycle
            .submit_application(job.id, &self.freelancer, 320.0)
            .await
            .expect("apply");
        self.lifecycle
            .accept_application(job.id, bid.id, &self.client)
            .await
            .expect("accept");
        if complete {
            self.lifecycle
                .complete_job(job.id, &self.client)
                .await
                .expect("complete")
        } else {
            job
        }
    }
}

fn submission(job: &Job, reviewed: &Actor, score: i64) -> RatingSubmission {
    RatingSubmission {
        job_id: job.id,
        reviewed_id: reviewed.actor_id,
        score,
        comment: Some("  Quick and tidy work ".to_string()),
    }
}

#[tokio::test]
async fn both_parties_rate_each_other_once() {
    let f = fixture();
    let job = f.hired_job(true).await;

    let by_client = f
        .ratings
        .submit(&f.client, submission(&job, &f.freelancer, 5))
        .await
        .expect("client rates");
    assert_eq!(by_client.score.get(), 5);
    assert_eq!(by_client.comment.as_deref(), Some("Quick and tidy work"));

    f.ratings
        .submit(&f.freelancer, submission(&job, &f.client, 4))
        .await
        .expect("freelancer rates");

    let again = f
        .ratings
        .submit(&f.client, submission(&job, &f.freelancer, 3))
        .await
        .expect_err("one rating per job");
    assert_eq!(again.code(), ErrorCode::AlreadyRated);

    let summary = f.ratings.summary(f.freelancer.actor_id).await.expect("summary");
    assert_eq!(summary.total, 1);
    assert_eq!(summary.average, 5.0);
}

#[tokio::test]
async fn score_and_comment_are_checked_first() {
    let f = fixture();
    let job = f.hired_job(true).await;

    for score in [0, 6, -1, 300] {
        let err = f
            .ratings
            .submit(&f.client, submission(&job, &f.freelancer, score))
            .await
            .expect_err("out of range");
        assert!(matches!(err, LifecycleError::Validation { field: "score", .. }));
    }

    let mut long = submission(&job, &f.freelancer, 4);
    long.comment = Some("x".repeat(1001));
    let err = f.ratings.submit(&f.client, long).await.expect_err("too long");
    assert!(matches!(err, LifecycleError::Validation { field: "comment", .. }));
}

#[tokio::test]
async fn only_completed_jobs_can_be_rated() {
    let f = fixture();
    let job = f.hired_job(false).await;

    let err = f
        .ratings
        .submit(&f.client, submission(&job, &f.freelancer, 4))
        .await
        .expect_err("still in progress");
    assert_eq!(err.code(), ErrorCode::JobNotCompleted);
}

#[tokio::test]
async fn outsiders_and_wrong_targets_are_refused() {
    let f = fixture();
    let job = f.hired_job(true).await;

    let outsider = Actor::freelancer(UserId::new());
    let err = f
        .ratings
        .submit(&outsider, submission(&job, &f.client, 1))
        .await
        .expect_err("not a participant");
    assert_eq!(err.code(), ErrorCode::NotJobParticipant);

    let err = f
        .ratings
        .submit(&f.client, submission(&job, &f.client, 5))
        .await
        .expect_err("cannot rate yourself");
    assert!(matches!(
        err,
        LifecycleError::Validation {
            field: "reviewed_id",
            ..
        }
    ));
}

#[tokio::test]
async fn job_ratings_and_history_list_both_directions() {
    let f = fixture();
    let job = f.hired_job(true).await;
    let given = f
        .ratings
        .submit(&f.client, submission(&job, &f.freelancer, 5))
        .await
        .expect("client rates");
    let received = f
        .ratings
        .submit(&f.freelancer, submission(&job, &f.client, 3))
        .await
        .expect("freelancer rates");

    let on_job = f.ratings.for_job(job.id).await.expect("job ratings");
    assert_eq!(on_job.len(), 2);

    let history = f.ratings.history(&f.client).await.expect("history");
    assert_eq!(history.given, vec![given]);
    assert_eq!(history.received, vec![received]);
}

#[tokio::test]
async fn only_the_author_edits_or_deletes_a_rating() {
    let f = fixture();
    let job = f.hired_job(true).await;
    let rating = f
        .ratings
        .submit(&f.client, submission(&job, &f.freelancer, 2))
        .await
        .expect("client rates");

    let err = f
        .ratings
        .update(
            &f.freelancer,
            rating.id,
            RatingEdit {
                score: 5,
                comment: None,
            },
        )
        .await
        .expect_err("not the author");
    assert_eq!(err.code(), ErrorCode::NotRatingAuthor);
    let err = f
        .ratings
        .delete(&f.freelancer, rating.id)
        .await
        .expect_err("not the author");
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let edited = f
        .ratings
        .update(
            &f.client,
            rating.id,
            RatingEdit {
                score: 4,
                comment: Some("Came back to finish the trim".to_string()),
            },
        )
        .await
        .expect("author edits");
    assert_eq!(edited.score.get(), 4);
    assert_eq!(edited.comment.as_deref(), Some("Came back to finish the trim"));
    assert!(edited.updated_at.is_some());
    assert_eq!(edited.created_at, rating.created_at);

    let err = f
        .ratings
        .update(
            &f.client,
            rating.id,
            RatingEdit {
                score: 9,
                comment: None,
            },
        )
        .await
        .expect_err("score still checked");
    assert!(matches!(err, LifecycleError::Validation { field: "score", .. }));

    f.ratings
        .delete(&f.client, rating.id)
        .await
        .expect("author deletes");
    let summary = f.ratings.summary(f.freelancer.actor_id).await.expect("summary");
    assert_eq!(summary.total, 0);

    let err = f
        .ratings
        .delete(&f.client, rating.id)
        .await
        .expect_err("already gone");
    assert_eq!(err.code(), ErrorCode::RatingNotFound);
    let err = f
        .ratings
        .delete(&f.client, RatingId::new())
        .await
        .expect_err("never existed");
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn ratings_over_http() {
    let f = fixture();
    let job = f.hired_job(true).await;
    let app = rating_router(f.ratings.clone());

    let created = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/ratings")
                .header(ACTOR_ID_HEADER, f.client.actor_id.to_string())
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "job_id": job.id,
                        "reviewed_id": f.freelancer.actor_id,
                        "score": 4
                    })
                    .to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);

    let summary = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/ratings/users/{}", f.freelancer.actor_id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(summary.status(), StatusCode::OK);
    let body = read_json(summary).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["average"], 4.0);
    assert_eq!(body["breakdown"]["4"], 1);
}

#[tokio::test]
async fn rating_edits_over_http_are_author_only() {
    let f = fixture();
    let job = f.hired_job(true).await;
    let rating = f
        .ratings
        .submit(&f.client, submission(&job, &f.freelancer, 3))
        .await
        .expect("client rates");
    let app = rating_router(f.ratings.clone());
    let edit = |actor: &Actor| {
        Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/v1/ratings/{}", rating.id))
            .header(ACTOR_ID_HEADER, actor.actor_id.to_string())
            .header("content-type", "application/json")
            .body(Body::from(json!({ "score": 5 }).to_string()))
            .expect("request")
    };

    let refused = app.clone().oneshot(edit(&f.freelancer)).await.expect("response");
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
    let body = read_json(refused).await;
    assert_eq!(body["error"]["code"], "not_rating_author");

    let edited = app.clone().oneshot(edit(&f.client)).await.expect("response");
    assert_eq!(edited.status(), StatusCode::OK);
    assert_eq!(read_json(edited).await["score"], 5);

    let history = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/ratings/history")
                .header(ACTOR_ID_HEADER, f.freelancer.actor_id.to_string())
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(history.status(), StatusCode::OK);
    let body = read_json(history).await;
    assert_eq!(body["received"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["given"].as_array().map(Vec::len), Some(0));

    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/ratings/{}", rating.id))
                .header(ACTOR_ID_HEADER, f.client.actor_id.to_string())
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(deleted.status(), StatusCode::OK);

    let on_job = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/ratings/jobs/{}", job.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(on_job.status(), StatusCode::OK);
    assert_eq!(read_json(on_job).await, json!([]));
}
