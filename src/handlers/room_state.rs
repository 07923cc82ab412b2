use crate::{auth::Identity, models::RoomStateResponse, AppState};
use axum::{extract::{Extension, Path, State}, Json};
use tracing::debug;

/// Current objects, comments and roster of a room
pub async fn room_state(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(room_id): Path<String>,
) -> Json<RoomStateResponse> {
    debug!("Room state for {} requested by {}", room_id, identity.user_id);
    Json(state.registry.room_state(&room_id).await)
}
