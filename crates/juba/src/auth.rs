//! Caller identity as forwarded by the authenticating gateway.
//!
//! Tokens are verified upstream; handlers only see the resulting headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::jobs::domain::{Actor, ActorRole, UserId};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_ADMIN_HEADER: &str = "x-actor-admin";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("missing x-actor-id header")]
    MissingActor,
    #[error("x-actor-id must be a UUID")]
    MalformedActor,
    #[error("{0}")]
    UnknownRole(String),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": {
                "code": "unauthenticated",
                "message": self.to_string(),
            }
        });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

/// Read the actor headers. The role defaults to `both` and admin to `false`.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, IdentityError> {
    let raw_id = header(headers, ACTOR_ID_HEADER).ok_or(IdentityError::MissingActor)?;
    let actor_id: UserId = raw_id.parse().map_err(|_| IdentityError::MalformedActor)?;

    let role = match header(headers, ACTOR_ROLE_HEADER) {
        Some(raw) => raw.parse::<ActorRole>().map_err(IdentityError::UnknownRole)?,
        None => ActorRole::default(),
    };
    let is_admin = header(headers, ACTOR_ADMIN_HEADER)
        .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    Ok(Actor {
        actor_id,
        role,
        is_admin,
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}
