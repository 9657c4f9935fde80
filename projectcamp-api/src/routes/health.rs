/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/healthcheck
/// ```
///
/// # Response
///
/// ```json
/// {
///   "statusCode": 200,
///   "success": true,
///   "data": { "status": "healthy", "version": "0.1.0", "database": "connected" },
///   "message": "Server is running"
/// }
/// ```

use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::extract::State;
use projectcamp_shared::db::pool::health_check as database_health_check;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the database is unreachable
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthResponse>> {
    let connected = match database_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    Ok(ApiResponse::ok(
        HealthResponse {
            status: if connected { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if connected { "connected" } else { "disconnected" }.to_string(),
        },
        "Server is running",
    ))
}
