use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::center::{NotificationCenter, NotificationId};
use crate::jobs::{Actor, ErrorCode, LifecycleError};

pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;

pub fn notification_router(center: Arc<NotificationCenter>) -> Router {
    Router::new()
        .route("/api/v1/notifications", get(list_notifications))
        .route("/api/v1/notifications/unread-count", get(unread_count))
        .route("/api/v1/notifications/read", post(mark_read))
        .route(
            "/api/v1/notifications/subscriptions",
            post(subscribe_job_alerts).delete(unsubscribe_job_alerts),
        )
        .route(
            "/api/v1/notifications/:notification_id",
            delete(delete_notification),
        )
        .with_state(center)
}

type CenterState = State<Arc<NotificationCenter>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MarkReadBody {
    /// Omitted means every notification of the caller.
    #[serde(default)]
    pub ids: Option<Vec<NotificationId>>,
}

pub(crate) async fn list_notifications(
    State(center): CenterState,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    match center.list(actor.actor_id, limit, query.offset.unwrap_or(0)) {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn unread_count(State(center): CenterState, actor: Actor) -> Response {
    match center.unread_count(actor.actor_id) {
        Ok(count) => (StatusCode::OK, Json(json!({ "unread": count }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn mark_read(
    State(center): CenterState,
    actor: Actor,
    body: Option<Json<MarkReadBody>>,
) -> Response {
    let ids = body.and_then(|Json(body)| body.ids);
    match center.mark_read(actor.actor_id, ids.as_deref()) {
        Ok(updated) => (StatusCode::OK, Json(json!({ "updated": updated }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_notification(
    State(center): CenterState,
    actor: Actor,
    Path(notification_id): Path<NotificationId>,
) -> Response {
    match center.delete(actor.actor_id, notification_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn subscribe_job_alerts(State(center): CenterState, actor: Actor) -> Response {
    if !actor.role.can_apply() {
        return LifecycleError::unauthorized(
            ErrorCode::RoleNotPermitted,
            "only freelancers can receive job alerts",
        )
        .into_response();
    }
    match center.register_for_job_alerts(actor.actor_id) {
        Ok(_) => (StatusCode::OK, Json(json!({ "subscribed": true }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn unsubscribe_job_alerts(State(center): CenterState, actor: Actor) -> Response {
    match center.unregister_from_job_alerts(actor.actor_id) {
        Ok(_) => (StatusCode::OK, Json(json!({ "subscribed": false }))).into_response(),
        Err(err) => err.into_response(),
    }
}
