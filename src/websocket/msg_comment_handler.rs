use tracing::info;
use crate::errors::CollabError;
use crate::models::CommentRequest;
use crate::ws::{connctx::ConnCtx, registry::RoomHandle};

/// Handle CommentRequest - Append and Broadcast
pub async fn handle_comment_message(comment_msg: CommentRequest, room: &RoomHandle, conn: &ConnCtx) -> Result<(), CollabError> {
    let comment = room.append_comment(conn, &comment_msg.text, comment_msg.target_object_id).await?;
    info!(
        "Comment {} appended in room {} by {} (seq {})",
        comment.comment_id, room.room_id(), comment.author_id, comment.server_seq
    );
    Ok(())
}
