use tracing::debug;
use crate::errors::CollabError;
use crate::models::ObjectSelectRequest;
use crate::ws::{connctx::ConnCtx, registry::RoomHandle};

/// Handle ObjectSelectRequest - relayed to peers, never stored
pub async fn handle_select_message(select_msg: ObjectSelectRequest, room: &RoomHandle, conn: &ConnCtx) -> Result<(), CollabError> {
    let delivered = room.relay_selection(conn, select_msg.object_id).await?;
    debug!("Selection from {} relayed to {} peers in room {}", conn.connection_id, delivered, room.room_id());
    Ok(())
}
