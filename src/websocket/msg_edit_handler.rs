use tracing::debug;
use crate::errors::CollabError;
use crate::models::ObjectEditRequest;
use crate::ws::{connctx::ConnCtx, registry::RoomHandle};

/// Handle ObjectEditRequest - Check, Apply and Broadcast
pub async fn handle_edit_message(edit_msg: ObjectEditRequest, room: &RoomHandle, conn: &ConnCtx) -> Result<(), CollabError> {
    let record = room.apply_edit(conn, edit_msg.object_id.as_deref(), edit_msg.payload).await?;
    debug!(
        "Edit applied in room {}: object={}, author={}, seq={}",
        room.room_id(), record.object_id, record.author_id, record.server_seq
    );
    Ok(())
}
