use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use super::domain::{RatingEdit, RatingId, RatingSubmission};
use super::service::RatingService;
use crate::jobs::{Actor, JobId, UserId};

pub fn rating_router(service: Arc<RatingService>) -> Router {
    Router::new()
        .route("/api/v1/ratings", post(submit_rating))
        .route("/api/v1/ratings/history", get(rating_history))
        .route("/api/v1/ratings/jobs/:job_id", get(job_ratings))
        .route("/api/v1/ratings/users/:user_id", get(rating_summary))
        .route(
            "/api/v1/ratings/:rating_id",
            put(edit_rating).delete(delete_rating),
        )
        .with_state(service)
}

type RatingState = State<Arc<RatingService>>;

pub(crate) async fn submit_rating(
    State(service): RatingState,
    actor: Actor,
    Json(submission): Json<RatingSubmission>,
) -> Response {
    match service.submit(&actor, submission).await {
        Ok(rating) => (StatusCode::CREATED, Json(rating)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn rating_summary(
    State(service): RatingState,
    Path(user_id): Path<UserId>,
) -> Response {
    match service.summary(user_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn job_ratings(
    State(service): RatingState,
    Path(job_id): Path<JobId>,
) -> Response {
    match service.for_job(job_id).await {
        Ok(ratings) => (StatusCode::OK, Json(ratings)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn rating_history(State(service): RatingState, actor: Actor) -> Response {
    match service.history(&actor).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn edit_rating(
    State(service): RatingState,
    actor: Actor,
    Path(rating_id): Path<RatingId>,
    Json(edit): Json<RatingEdit>,
) -> Response {
    match service.update(&actor, rating_id, edit).await {
        Ok(rating) => (StatusCode::OK, Json(rating)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_rating(
    State(service): RatingState,
    actor: Actor,
    Path(rating_id): Path<RatingId>,
) -> Response {
    match service.delete(&actor, rating_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "deleted": rating_id }))).into_response(),
        Err(err) => err.into_response(),
    }
}
