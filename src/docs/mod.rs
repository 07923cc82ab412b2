use utoipa::OpenApi;
use crate::auth::Identity;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Readiness status", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Current shared state of a room
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}",
    params(
        ("room_id" = String, Path, description = "Document identifier the room is bound to")
    ),
    responses(
        (status = 200, description = "Objects, comments and roster of the room", body = RoomStateResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn room_state_doc() {}

/// Server diagnostics, cloud admins only
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Not a cloud admin", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        room_state_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, ErrorResponse, RoomStateResponse, DiagnosticsResponse, EditRecord, Comment, RosterEntry, Identity)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
