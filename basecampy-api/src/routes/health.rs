/// Health check endpoint
///
/// ```text
/// GET /api/v1/healthcheck
/// ```
///
/// ```json
/// {
///   "status_code": 200,
///   "data": {
///     "status": "healthy",
///     "version": "0.1.0",
///     "database": "connected",
///     "latency_ms": 1,
///     "pool": { "active_connections": 1, "idle_connections": 1, "total_connections": 2 }
///   },
///   "message": "Server is running",
///   "success": true
/// }
/// ```
///
/// A database failure degrades the status but still answers 200.

use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::extract::State;
use basecampy_shared::db::pool::{self, PoolStats};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,

    /// Database round trip, when connected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    pub pool: PoolStats,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthResponse>> {
    let (status, database, latency_ms) = match pool::health_check(&state.db).await {
        Ok(latency) => ("healthy", "connected", Some(latency.as_millis() as u64)),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            ("degraded", "disconnected", None)
        }
    };

    Ok(ApiResponse::ok(
        HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
            latency_ms,
            pool: pool::pool_stats(&state.db),
        },
        "Server is running",
    ))
}
