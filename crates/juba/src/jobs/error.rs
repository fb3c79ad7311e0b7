use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::lifecycle::TransitionError;
use super::repository::RepositoryError;

/// Stable machine-readable code attached to every lifecycle failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationFailed,
    JobNotFound,
    JobNotOpen,
    ApplicationNotFound,
    ApplicationNotPending,
    NotJobOwner,
    NotJobParticipant,
    RoleNotPermitted,
    JobNotInProgress,
    JobNotCompleted,
    JobClosed,
    JobStateChanged,
    CannotDeleteCompletedJob,
    DuplicateApplication,
    ActiveJobLimit,
    NoAcceptedApplication,
    AlreadyRated,
    RatingNotFound,
    NotRatingAuthor,
    NotificationNotFound,
    DependencyUnavailable,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "validation_failed",
            ErrorCode::JobNotFound => "job_not_found",
            ErrorCode::JobNotOpen => "job_not_open",
            ErrorCode::ApplicationNotFound => "application_not_found",
            ErrorCode::ApplicationNotPending => "application_not_pending",
            ErrorCode::NotJobOwner => "not_job_owner",
            ErrorCode::NotJobParticipant => "not_job_participant",
            ErrorCode::RoleNotPermitted => "role_not_permitted",
            ErrorCode::JobNotInProgress => "job_not_in_progress",
            ErrorCode::JobNotCompleted => "job_not_completed",
            ErrorCode::JobClosed => "job_closed",
            ErrorCode::JobStateChanged => "job_state_changed",
            ErrorCode::CannotDeleteCompletedJob => "cannot_delete_completed_job",
            ErrorCode::DuplicateApplication => "duplicate_application",
            ErrorCode::ActiveJobLimit => "active_job_limit",
            ErrorCode::NoAcceptedApplication => "no_accepted_application",
            ErrorCode::AlreadyRated => "already_rated",
            ErrorCode::RatingNotFound => "rating_not_found",
            ErrorCode::NotRatingAuthor => "not_rating_author",
            ErrorCode::NotificationNotFound => "notification_not_found",
            ErrorCode::DependencyUnavailable => "dependency_unavailable",
        }
    }
}

/// Failure taxonomy for marketplace operations.
///
/// Guard failures carry enough detail for a user-facing message. `Dependency`
/// only ever comes from a primary write or read; best-effort side channels
/// are logged and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{message}")]
    NotFound { code: ErrorCode, message: String },
    #[error("{message}")]
    Authorization { code: ErrorCode, message: String },
    #[error("{message}")]
    Conflict { code: ErrorCode, message: String },
    #[error("dependency unavailable: {0}")]
    Dependency(String),
}

impl LifecycleError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Authorization {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn job_not_found() -> Self {
        Self::not_found(ErrorCode::JobNotFound, "job not found")
    }

    pub fn not_owner() -> Self {
        Self::unauthorized(ErrorCode::NotJobOwner, "only the job owner can do this")
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            LifecycleError::Validation { .. } => ErrorCode::ValidationFailed,
            LifecycleError::NotFound { code, .. }
            | LifecycleError::Authorization { code, .. }
            | LifecycleError::Conflict { code, .. } => *code,
            LifecycleError::Dependency(_) => ErrorCode::DependencyUnavailable,
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            LifecycleError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::NotFound { .. } => StatusCode::NOT_FOUND,
            LifecycleError::Authorization { .. } => StatusCode::FORBIDDEN,
            LifecycleError::Conflict { .. } => StatusCode::CONFLICT,
            LifecycleError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<RepositoryError> for LifecycleError {
    fn from(value: RepositoryError) -> Self {
        Self::Dependency(value.to_string())
    }
}

impl From<TransitionError> for LifecycleError {
    fn from(value: TransitionError) -> Self {
        let code = match value {
            TransitionError::NotOpen(_) => ErrorCode::JobNotOpen,
            TransitionError::NotInProgress(_) => ErrorCode::JobNotInProgress,
            TransitionError::CompletedIsPermanent => ErrorCode::CannotDeleteCompletedJob,
            TransitionError::Closed(_) => ErrorCode::JobClosed,
            TransitionError::AlreadyDecided(_) => {
                return Self::not_found(ErrorCode::ApplicationNotPending, value.to_string());
            }
        };
        Self::conflict(code, value.to_string())
    }
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let LifecycleError::Validation { field, .. } = &self {
            error["field"] = json!(field);
        }
        (status, Json(json!({ "error": error }))).into_response()
    }
}
