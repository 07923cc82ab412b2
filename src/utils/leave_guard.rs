use std::sync::Arc;
use tracing::debug;
use crate::ws::{connctx::ConnCtx, registry::RoomRegistry};

/// Makes sure a joined connection leaves its room, even when the connection task is
/// dropped before reaching its own cleanup.
pub struct LeaveGuard {
    registry: Arc<RoomRegistry>,
    conn: Option<ConnCtx>,
}

impl LeaveGuard {
    pub fn new(registry: Arc<RoomRegistry>, conn: ConnCtx) -> Self {
        Self { registry, conn: Some(conn) }
    }

    /// Leave now. Returns whether the connection was still a member.
    pub async fn leave(mut self) -> bool {
        match self.conn.take() {
            Some(conn) => self.registry.leave(&conn).await,
            None => false,
        }
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let registry = self.registry.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                debug!("Connection {} dropped without leaving, cleaning up", conn.connection_id);
                handle.spawn(async move {
                    registry.leave(&conn).await;
                });
            }
        }
    }
}
