use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{Actor, ApplicationId, JobFields, JobId, JobPatch};
use super::error::LifecycleError;
use super::queries::JobQuery;
use super::service::JobLifecycleService;
use crate::rate_limit::{enforce, BrowseLimiter};

/// Router builder exposing job, application, and dashboard endpoints.
///
/// The public browse routes (`GET /api/v1/jobs` and `GET /api/v1/jobs/:job_id`)
/// draw from `limiter`; everything else requires actor headers instead.
pub fn job_router(service: Arc<JobLifecycleService>, limiter: Arc<BrowseLimiter>) -> Router {
    Router::new()
        .route(
            "/api/v1/jobs",
            get(list_jobs)
                .layer::<_, Infallible>(from_fn_with_state(limiter.clone(), enforce))
                .post(create_job),
        )
        .route("/api/v1/jobs/mine", get(my_jobs))
        .route("/api/v1/jobs/stats/client", get(client_stats))
        .route("/api/v1/jobs/stats/freelancer", get(freelancer_stats))
        .route("/api/v1/jobs/batch-status", get(batch_status))
        .route(
            "/api/v1/jobs/:job_id",
            get(job_detail)
                .layer::<_, Infallible>(from_fn_with_state(limiter, enforce))
                .put(update_job)
                .delete(delete_job),
        )
        .route("/api/v1/jobs/:job_id/complete", post(complete_job))
        .route("/api/v1/jobs/:job_id/payment", post(process_payment))
        .route(
            "/api/v1/jobs/:job_id/applications",
            get(job_applications).post(submit_application),
        )
        .route(
            "/api/v1/jobs/:job_id/applications/:application_id/accept",
            post(accept_application),
        )
        .route(
            "/api/v1/jobs/:job_id/applications/:application_id/reject",
            post(reject_application),
        )
        .route("/api/v1/applications/mine", get(my_applications))
        .with_state(service)
}

type ServiceState = State<Arc<JobLifecycleService>>;

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationBody {
    pub proposed_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PaymentBody {
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchQuery {
    #[serde(default)]
    pub ids: String,
}

fn reply<T: Serialize>(status: StatusCode, result: Result<T, LifecycleError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => {
            debug!(code = err.code().as_str(), error = %err, "request refused");
            err.into_response()
        }
    }
}

pub(crate) async fn list_jobs(
    State(service): ServiceState,
    Query(query): Query<JobQuery>,
) -> Response {
    reply(StatusCode::OK, service.list_jobs(&query).await)
}

pub(crate) async fn create_job(
    State(service): ServiceState,
    actor: Actor,
    Json(fields): Json<JobFields>,
) -> Response {
    reply(StatusCode::CREATED, service.create_job(&actor, fields).await)
}

pub(crate) async fn my_jobs(State(service): ServiceState, actor: Actor) -> Response {
    reply(StatusCode::OK, service.my_jobs(&actor).await)
}

pub(crate) async fn client_stats(State(service): ServiceState, actor: Actor) -> Response {
    reply(StatusCode::OK, service.client_stats(&actor).await)
}

pub(crate) async fn freelancer_stats(State(service): ServiceState, actor: Actor) -> Response {
    reply(StatusCode::OK, service.freelancer_stats(&actor).await)
}

pub(crate) async fn batch_status(
    State(service): ServiceState,
    _actor: Actor,
    Query(query): Query<BatchQuery>,
) -> Response {
    let ids = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            raw.parse::<JobId>()
                .map_err(|_| LifecycleError::validation("ids", format!("'{raw}' is not a job id")))
        })
        .collect::<Result<Vec<_>, _>>();

    match ids {
        Ok(ids) => reply(StatusCode::OK, service.batch_status(ids).await),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn job_detail(
    State(service): ServiceState,
    Path(job_id): Path<JobId>,
) -> Response {
    reply(StatusCode::OK, service.job_detail(job_id).await)
}

pub(crate) async fn update_job(
    State(service): ServiceState,
    actor: Actor,
    Path(job_id): Path<JobId>,
    Json(patch): Json<JobPatch>,
) -> Response {
    reply(StatusCode::OK, service.update_job(job_id, &actor, patch).await)
}

pub(crate) async fn delete_job(
    State(service): ServiceState,
    actor: Actor,
    Path(job_id): Path<JobId>,
) -> Response {
    reply(StatusCode::OK, service.delete_job(job_id, &actor).await)
}

pub(crate) async fn complete_job(
    State(service): ServiceState,
    actor: Actor,
    Path(job_id): Path<JobId>,
) -> Response {
    reply(StatusCode::OK, service.complete_job(job_id, &actor).await)
}

pub(crate) async fn process_payment(
    State(service): ServiceState,
    actor: Actor,
    Path(job_id): Path<JobId>,
    body: Option<Json<PaymentBody>>,
) -> Response {
    let method = body
        .and_then(|Json(body)| body.payment_method)
        .unwrap_or_else(|| "card".to_string());
    reply(
        StatusCode::OK,
        service.process_payment(job_id, &actor, method).await,
    )
}

pub(crate) async fn job_applications(
    State(service): ServiceState,
    Path(job_id): Path<JobId>,
) -> Response {
    reply(StatusCode::OK, service.job_applications(job_id).await)
}

pub(crate) async fn submit_application(
    State(service): ServiceState,
    actor: Actor,
    Path(job_id): Path<JobId>,
    Json(body): Json<ApplicationBody>,
) -> Response {
    reply(
        StatusCode::CREATED,
        service
            .submit_application(job_id, &actor, body.proposed_rate)
            .await,
    )
}

pub(crate) async fn accept_application(
    State(service): ServiceState,
    actor: Actor,
    Path((job_id, application_id)): Path<(JobId, ApplicationId)>,
) -> Response {
    reply(
        StatusCode::OK,
        service
            .accept_application(job_id, application_id, &actor)
            .await,
    )
}

pub(crate) async fn reject_application(
    State(service): ServiceState,
    actor: Actor,
    Path((job_id, application_id)): Path<(JobId, ApplicationId)>,
) -> Response {
    reply(
        StatusCode::OK,
        service
            .reject_application(job_id, application_id, &actor)
            .await,
    )
}

pub(crate) async fn my_applications(State(service): ServiceState, actor: Actor) -> Response {
    reply(StatusCode::OK, service.my_applications(&actor).await)
}
