use tracing::debug;
use chrono::Utc;
use crate::errors::CollabError;
use crate::models::{PingMessage, PongMessage, SendMessage};
use crate::ws::{connctx::ConnCtx, registry::RoomHandle};

/// Handle PingMessage
pub async fn handle_ping_message(_ping_msg: &PingMessage, room: &RoomHandle, conn: &ConnCtx) -> Result<(), CollabError> {
    // Handle ping message - send a pong message back.
    debug!("Ping message received for room {} from {}", room.room_id(), conn.connection_id);

    // Reply with pong
    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    room.reply(conn, &pong).await?;
    Ok(())
}
