/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// Handlers return `Result<T, ApiError>`, which converts to the matching
/// status code and JSON body.
///
/// # Example
///
/// ```
/// use kvlink_api::error::{ApiError, ApiResult};
/// use axum::Json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("No such route".to_string()))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kvlink_shared::health::HealthReport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Not found (404)
    NotFound(String),

    /// One or more health checks failed (503)
    ///
    /// The full report is returned as the body so callers can see which
    /// dependency is down.
    HealthCheckFailed(HealthReport),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::HealthCheckFailed(report) => write!(
                f,
                "Health check failed: {}",
                report.error.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::HealthCheckFailed(report) => {
                tracing::warn!(
                    failing = ?report.error.keys().collect::<Vec<_>>(),
                    "Health check failed"
                );
                (StatusCode::SERVICE_UNAVAILABLE, Json(report)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvlink_shared::health::{ComponentHealth, ComponentState, OverallStatus};
    use std::collections::BTreeMap;

    fn failing_report() -> HealthReport {
        let down = ComponentHealth {
            status: ComponentState::Down,
            message: "connection refused".to_string(),
        };
        let mut error = BTreeMap::new();
        error.insert("redis".to_string(), down);

        HealthReport {
            status: OverallStatus::Error,
            info: BTreeMap::new(),
            details: error.clone(),
            error,
        }
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::NotFound("/nope".to_string());
        assert_eq!(err.to_string(), "Not found: /nope");

        let err = ApiError::HealthCheckFailed(failing_report());
        assert_eq!(err.to_string(), "Health check failed: redis");
    }

    #[test]
    fn test_status_codes() {
        let response = ApiError::NotFound("/nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::HealthCheckFailed(failing_report()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
