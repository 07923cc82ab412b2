use axum::{extract::State, Json};
use crate::{models::HealthResponse, AppState};
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint. Refuses while no credential secret is configured,
/// since every WebSocket connection would be rejected.
pub async fn ready_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    if state.config.cloud_auth_jwt_secret.is_none() {
        return Json(HealthResponse {
            status: "unavailable".to_string(),
            message: "No JWT secret configured".to_string(),
        });
    }
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
    })
}
