use crate::models::RosterEntry;
use super::broadcaster::Outbound;
use super::comment_log::CommentLog;
use super::connctx::ConnCtx;
use super::object_store::ObjectStore;

/// A joined connection together with the queue its writer task drains.
#[derive(Debug)]
pub struct Member {
    pub conn: ConnCtx,
    pub outbound: Outbound,
}

/// Mutable state of one room. Always accessed under the room's lock.
#[derive(Debug, Default)]
pub struct Room {
    pub members: Vec<Member>,
    pub objects: ObjectStore,
    pub comments: CommentLog,
}

impl Room {
    pub fn is_member(&self, connection_id: &str) -> bool {
        self.members.iter().any(|m| m.conn.connection_id == connection_id)
    }

    pub fn member(&self, connection_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.conn.connection_id == connection_id)
    }

    /// Returns false when the connection was not a member.
    pub fn remove_member(&mut self, connection_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.conn.connection_id != connection_id);
        self.members.len() != before
    }

    /// Members in join order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.members.iter().map(|m| m.conn.roster_entry()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Drop everything the room holds.
    pub fn clear(&mut self) {
        self.members.clear();
        self.objects = ObjectStore::default();
        self.comments = CommentLog::default();
    }
}
