/// Health check endpoint
///
/// Runs every registered health check (currently just `redis`) and reports
/// the aggregate.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// 200 when every check passes:
/// ```json
/// {
///   "status": "ok",
///   "info": { "redis": { "status": "up", "message": "Redis is available" } },
///   "error": {},
///   "details": { "redis": { "status": "up", "message": "Redis is available" } }
/// }
/// ```
///
/// 503 with `"status": "error"` and the failing checks under `error`
/// otherwise.

use crate::{app::AppState, error::{ApiError, ApiResult}};
use axum::{extract::State, Json};
use kvlink_shared::health::HealthReport;

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthReport>> {
    let report = state.health.check().await;

    if report.is_healthy() {
        Ok(Json(report))
    } else {
        Err(ApiError::HealthCheckFailed(report))
    }
}
