use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};
use crate::errors::AuthError;
use crate::models::ErrorResponse;
use crate::services::auth_service::{authenticate, get_auth_token};
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {

    // 1. Get the auth token from the request
    let token = get_auth_token(req.headers()).ok();

    // 2. Verify it the same way WebSocket connections are verified
    let identity = match authenticate(token.as_deref(), state.config.cloud_auth_jwt_secret.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejecting API request to {}: {}", req.uri().path(), e);
            return unauthorized(&e);
        }
    };
    info!("API request to {} by user {}", req.uri().path(), identity.user_id);

    // 3. Make the identity available to downstream handlers
    req.extensions_mut().insert(identity);

    next.run(req).await
}

fn unauthorized(e: &AuthError) -> Response {
    let status = match e {
        AuthError::SecretNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    };
    (status, Json(ErrorResponse {
        code: status.as_u16(),
        status: status.to_string(),
        error: e.to_string(),
    })).into_response()
}
