//! Readiness probe.
//!
//! Liveness is the shared `missionboard_web::handlers::health_check`; readiness
//! additionally pings the database.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use missionboard_web::handlers::{readiness_response, HealthCheck, HealthReport};

/// Readiness check endpoint.
///
/// Returns 503 while the database cannot be reached.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"status":"healthy","checks":[{"component":"database","status":"healthy"}]}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match state.store.ping().await {
        Ok(()) => HealthCheck::healthy("database"),
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed");
            HealthCheck::unhealthy("database", "Database unreachable")
        }
    };
    readiness_response(vec![database])
}
