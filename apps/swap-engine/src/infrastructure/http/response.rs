//! HTTP response DTOs and error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::services::{QueueError, QueueStats};
use crate::application::use_cases::SubmitOrderError;
use crate::domain::order_execution::OrderError;

/// Error body returned by every failing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` while accepting orders, `draining` during shutdown.
    pub status: String,
    /// Engine version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current queue counts.
    pub queue: QueueStats,
}

/// Route failure mapped to a status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// 400.
    #[error("{0}")]
    BadRequest(String),
    /// 404.
    #[error("{0}")]
    NotFound(String),
    /// 409.
    #[error("{0}")]
    Conflict(String),
    /// 503.
    #[error("{0}")]
    Unavailable(String),
    /// 500.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidParameters { .. } => Self::BadRequest(err.to_string()),
            OrderError::NotFound { .. } => Self::NotFound(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<SubmitOrderError> for ApiError {
    fn from(err: SubmitOrderError) -> Self {
        match err {
            SubmitOrderError::Validation(e) => Self::BadRequest(e.to_string()),
            SubmitOrderError::Order(e) => e.into(),
            SubmitOrderError::Queue(e @ QueueError::ShuttingDown) => Self::Unavailable(e.to_string()),
            SubmitOrderError::Queue(e @ QueueError::Duplicate(_)) => Self::Conflict(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::ValidationError;
    use crate::domain::shared::OrderId;

    #[test]
    fn submit_errors_map_to_status_codes() {
        let cases = [
            (
                SubmitOrderError::Validation(ValidationError::NonPositiveAmount),
                StatusCode::BAD_REQUEST,
            ),
            (
                SubmitOrderError::Queue(QueueError::ShuttingDown),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SubmitOrderError::Queue(QueueError::Duplicate(OrderId::new("a"))),
                StatusCode::CONFLICT,
            ),
            (
                SubmitOrderError::Order(OrderError::Persistence("disk".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn health_response_is_camel_case() {
        let json = serde_json::to_value(HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 5,
            queue: QueueStats::default(),
        })
        .unwrap();
        assert_eq!(json["uptimeSecs"], 5);
        assert_eq!(json["queue"]["waiting"], 0);
    }
}
