pub mod auth;
pub mod config;
pub mod docs;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
pub mod websocket;
pub mod ws;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

/// Build the full router: REST API, WebSocket endpoint and Swagger UI.
pub fn create_app(state: AppState) -> Router {
    let api_routes = routes::create_api_routes(state.clone());

    let mut app = Router::new()
        // Mount API routes
        .nest("/api", api_routes)
        // Collaboration channel
        .route("/ws", get(websocket::handler::websocket_handler))
        .with_state(state.clone())
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http());

    let origins: Vec<HeaderValue> = state
        .config
        .cors_origin_list()
        .into_iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();
    if !origins.is_empty() {
        app = app.layer(CorsLayer::new().allow_origin(origins).allow_credentials(true)
            .allow_methods([axum::http::Method::GET])
            .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE]));
    }

    app
}
