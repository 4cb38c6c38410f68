use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::features::access::policy::PolicyError;

/// Error taxonomy shared by the scheduling service, the share registry
/// and the capability checker. The first three variants are routine,
/// expected outcomes; the last two are genuine faults.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Permission denied")]
    PermissionDenied,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Policy propagation failed: {0}")]
    PropagationFailure(String),
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl From<DieselError> for ServiceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => ServiceError::NotFound("Record"),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ServiceError::Conflict(info.message().to_string())
            }
            other => ServiceError::StorageFailure(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for ServiceError {
    fn from(err: r2d2::Error) -> Self {
        ServiceError::StorageFailure(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for ServiceError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ServiceError::StorageFailure(err.to_string())
    }
}

// An unreachable policy store means the permission question has no
// answer; that is a store fault, not a denial.
impl From<PolicyError> for ServiceError {
    fn from(err: PolicyError) -> Self {
        ServiceError::StorageFailure(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::PermissionDenied => (StatusCode::FORBIDDEN, self.to_string()),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServiceError::PropagationFailure(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ServiceError::StorageFailure(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage failure: {}", e),
            ),
        };

        let body = json!({
            "error": message,
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Handler-level umbrella error: everything the JSON API can answer with.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => {
                let body = json!({
                    "error": self.to_string(),
                    "status": StatusCode::UNAUTHORIZED.as_u16()
                });
                (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
            }
            ApiError::Validation(message) => {
                let body = json!({
                    "error": message,
                    "status": StatusCode::BAD_REQUEST.as_u16()
                });
                (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
            }
            ApiError::Service(e) => e.into_response(),
        }
    }
}
