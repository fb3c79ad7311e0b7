use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::domain::ReportSubmission;
use super::service::ReportService;
use crate::jobs::Actor;
use crate::rate_limit::{enforce, BrowseLimiter};

/// Report filing shares the per-client budget of the public browse routes.
pub fn report_router(service: Arc<ReportService>, limiter: Arc<BrowseLimiter>) -> Router {
    Router::new()
        .route(
            "/api/v1/reports",
            post(file_report).layer::<_, Infallible>(from_fn_with_state(limiter, enforce)),
        )
        .with_state(service)
}

pub(crate) async fn file_report(
    State(service): State<Arc<ReportService>>,
    actor: Actor,
    Json(submission): Json<ReportSubmission>,
) -> Response {
    match service.file(&actor, submission).await {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(err) => err.into_response(),
    }
}
