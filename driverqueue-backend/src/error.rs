use axum::{http::StatusCode, response::IntoResponse, Json};
use driverqueue_service::QueueError;
use serde_json::json;
use thiserror::Error;

use crate::validation::to_payload;

type SerdeJsonError = serde_json::Error;

/// Top-level API error shared by all route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("authentication error: {0}")]
    Authentication(#[from] driverqueue_auth::AuthError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    SerdeJson(#[from] SerdeJsonError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Queue(err) => match err {
                QueueError::Validation(_) | QueueError::InvalidState { .. } => {
                    StatusCode::BAD_REQUEST
                }
                QueueError::NotFound(_) => StatusCode::NOT_FOUND,
                QueueError::Conflict { .. } | QueueError::Contention { .. } => StatusCode::CONFLICT,
                QueueError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::SerdeJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        let payload = match &self {
            ApiError::Queue(QueueError::Validation(issues)) => to_payload(issues),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "request failed");
                json!({ "error": "internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(payload)).into_response()
    }
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driverqueue_service::{DriverStatus, ValidationIssue};

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn queue_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(QueueError::Validation(vec![ValidationIssue::new("plate", "required", "x")]).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                QueueError::InvalidState {
                    id: 1,
                    actual: DriverStatus::Waiting,
                    expected: DriverStatus::Called,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(QueueError::NotFound(9).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(QueueError::Conflict { plate: "ABC1234".into() }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(QueueError::Contention { operation: "call_next" }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(QueueError::Database(sqlx::Error::PoolTimedOut).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(driverqueue_auth::AuthError::AuthenticationFailed.into()),
            StatusCode::UNAUTHORIZED
        );
    }
}
