use crate::{handlers::{diagnostics, health_check, ready_check, room_state}, routes::auth_middleware::auth_middleware, AppState};
use axum::{routing::get, Router, middleware};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/rooms/:room_id", get(room_state))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)) // Applies to all routes added above
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
}
