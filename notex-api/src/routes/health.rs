/// Health check endpoint
///
/// Also used by the offline sync client as its connectivity probe, so any
/// answer other than 200 means the API cannot serve writes.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
///
/// `503 Service Unavailable` with `{"error": "Database unavailable"}` when the
/// database does not answer.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use notex_shared::db::pool::health_check as db_health_check;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

impl HealthResponse {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: "connected".to_string(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    db_health_check(&state.db).await.map_err(|e| {
        tracing::warn!(error = %e, "Database health check failed");
        ApiError::ServiceUnavailable("Database unavailable".to_string())
    })?;

    Ok(Json(HealthResponse::healthy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_response() {
        let healthy = HealthResponse::healthy();
        assert_eq!(healthy.status, "healthy");
        assert_eq!(healthy.database, "connected");
        assert!(!healthy.version.is_empty());
    }
}
