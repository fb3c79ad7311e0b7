use crate::infra::{AppState, Marketplace};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use juba::jobs::job_router;
use juba::notifications::notification_router;
use juba::ratings::rating_router;
use juba::reports::report_router;
use serde_json::json;

pub(crate) fn with_marketplace_routes(marketplace: &Marketplace) -> axum::Router {
    job_router(marketplace.jobs.clone(), marketplace.limiter.clone())
        .merge(rating_router(marketplace.ratings.clone()))
        .merge(notification_router(marketplace.notifications.clone()))
        .merge(report_router(
            marketplace.reports.clone(),
            marketplace.limiter.clone(),
        ))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
