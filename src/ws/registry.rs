//! Room registry: one live room per document id.
//!
//! The map itself is only locked for lookup, insertion and removal. Everything that
//! touches a room's members, objects or comments happens under that room's own mutex,
//! so rooms never contend with each other.
//!
//! A room whose last member leaves is flagged closed under its lock and then dropped
//! from the map. A join that raced onto a closed handle retries and gets a fresh room.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::errors::{CollabError, ValidationError};
use crate::models::{Comment, EditRecord, ObjectSelectMessage, RoomStateResponse, SendMessage, SnapshotMessage};
use super::broadcaster::{self, BroadcastStats, Outbound};
use super::connctx::ConnCtx;
use super::presence;
use super::room::{Member, Room};

pub struct RoomHandle {
    room_id: String,
    closed: AtomicBool,
    state: Mutex<Room>,
    stats: Arc<BroadcastStats>,
}

impl RoomHandle {
    fn new(room_id: &str, stats: Arc<BroadcastStats>) -> Self {
        Self {
            room_id: room_id.to_string(),
            closed: AtomicBool::new(false),
            state: Mutex::new(Room::default()),
            stats,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Apply an edit and relay it to everyone but the author.
    pub async fn apply_edit(&self, conn: &ConnCtx, object_id: Option<&str>, payload: Value) -> Result<EditRecord, CollabError> {
        let mut room = self.state.lock().await;
        ensure_member(&room, conn)?;

        let record = room.objects.apply_edit(object_id, payload, &conn.identity.user_id)?;
        let event = SendMessage::ObjectEdit(record.clone());
        broadcaster::fanout(&room.members, &event, Some(&conn.connection_id), &self.stats)?;
        Ok(record)
    }

    /// Append a comment and relay it to everyone but the author.
    pub async fn append_comment(&self, conn: &ConnCtx, text: &str, target_object_id: Option<String>) -> Result<Comment, CollabError> {
        let mut room = self.state.lock().await;
        ensure_member(&room, conn)?;

        let comment = room.comments.append(&conn.identity, text, target_object_id)?;
        let event = SendMessage::Comment(comment.clone());
        broadcaster::fanout(&room.members, &event, Some(&conn.connection_id), &self.stats)?;
        Ok(comment)
    }

    /// Relay a selection change. Nothing is stored.
    pub async fn relay_selection(&self, conn: &ConnCtx, object_id: Option<String>) -> Result<usize, CollabError> {
        let room = self.state.lock().await;
        ensure_member(&room, conn)?;

        let event = SendMessage::ObjectSelect(ObjectSelectMessage {
            object_id,
            user_id: conn.identity.user_id.clone(),
            connection_id: conn.connection_id.clone(),
        });
        Ok(broadcaster::fanout(&room.members, &event, Some(&conn.connection_id), &self.stats)?)
    }

    /// Queue an event for one member only.
    pub async fn reply(&self, conn: &ConnCtx, event: &SendMessage) -> Result<bool, CollabError> {
        let room = self.state.lock().await;
        let member = room
            .member(&conn.connection_id)
            .ok_or_else(|| ValidationError::NotJoined(conn.connection_id.clone()))?;
        Ok(broadcaster::send_to(member, event, &self.stats)?)
    }

    pub async fn state(&self) -> RoomStateResponse {
        let room = self.state.lock().await;
        RoomStateResponse {
            room_id: self.room_id.clone(),
            objects: room.objects.snapshot(),
            comments: room.comments.snapshot(),
            roster: room.roster(),
        }
    }
}

fn ensure_member(room: &Room, conn: &ConnCtx) -> Result<(), ValidationError> {
    if room.is_member(&conn.connection_id) {
        Ok(())
    } else {
        Err(ValidationError::NotJoined(conn.connection_id.clone()))
    }
}

/// Aggregate figures over all live rooms.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub rooms: usize,
    pub connections: usize,
    pub objects: usize,
    pub comments: usize,
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<RoomHandle>>>,
    stats: Arc<BroadcastStats>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            stats: Arc::new(BroadcastStats::default()),
        }
    }

    pub fn broadcast_stats(&self) -> &BroadcastStats {
        &self.stats
    }

    /// Join `conn` to its room, creating the room if needed.
    ///
    /// The joiner's snapshot is queued before the member becomes visible to other
    /// operations on the room, so it always precedes live events on that connection.
    /// Joining again with the same connection returns the existing handle.
    pub async fn join(&self, conn: &ConnCtx, outbound: Outbound) -> Result<Arc<RoomHandle>, CollabError> {
        loop {
            let handle = self.get_or_create(&conn.room_id).await;
            let mut room = handle.state.lock().await;
            if handle.is_closed() {
                debug!("Room {} closed while joining, retrying", conn.room_id);
                continue;
            }
            if room.is_member(&conn.connection_id) {
                return Ok(handle.clone());
            }

            let member = Member { conn: conn.clone(), outbound };
            let mut roster = room.roster();
            roster.push(conn.roster_entry());
            let snapshot = SendMessage::Snapshot(SnapshotMessage {
                connection_id: conn.connection_id.clone(),
                objects: room.objects.snapshot(),
                comments: room.comments.snapshot(),
                roster,
            });
            broadcaster::send_to(&member, &snapshot, &self.stats)?;
            room.members.push(member);

            info!(
                "Connection {} (user {}) joined room {} ({} members)",
                conn.connection_id, conn.identity.user_id, conn.room_id, room.members.len()
            );
            if let Err(e) = presence::announce(&conn.room_id, &room, &self.stats) {
                error!("Failed to announce roster for room {}: {}", conn.room_id, e);
            }
            drop(room);
            return Ok(handle);
        }
    }

    /// Remove `conn` from its room. Returns false if it was not a member, which makes
    /// repeated calls harmless. The last leave discards the room and all its state.
    pub async fn leave(&self, conn: &ConnCtx) -> bool {
        let Some(handle) = self.rooms.read().await.get(&conn.room_id).cloned() else {
            return false;
        };

        let emptied = {
            let mut room = handle.state.lock().await;
            if !room.remove_member(&conn.connection_id) {
                return false;
            }
            info!(
                "Connection {} (user {}) left room {} ({} members)",
                conn.connection_id, conn.identity.user_id, conn.room_id, room.members.len()
            );

            if room.is_empty() {
                handle.closed.store(true, Ordering::Release);
                room.clear();
                true
            } else {
                if let Err(e) = presence::announce(&conn.room_id, &room, &self.stats) {
                    error!("Failed to announce roster for room {}: {}", conn.room_id, e);
                }
                false
            }
        };

        if emptied {
            let mut rooms = self.rooms.write().await;
            let current = rooms.get(&conn.room_id).map(|r| Arc::ptr_eq(r, &handle)).unwrap_or(false);
            if current {
                rooms.remove(&conn.room_id);
            }
            info!("Room {} is empty and was discarded", conn.room_id);
        }
        true
    }

    pub async fn get(&self, room_id: &str) -> Option<Arc<RoomHandle>> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .filter(|r| !r.is_closed())
            .cloned()
    }

    /// Current state of a room; empty when the room is not live.
    pub async fn room_state(&self, room_id: &str) -> RoomStateResponse {
        match self.get(room_id).await {
            Some(handle) => handle.state().await,
            None => RoomStateResponse {
                room_id: room_id.to_string(),
                ..RoomStateResponse::default()
            },
        }
    }

    pub async fn stats(&self) -> RegistryStats {
        let handles: Vec<Arc<RoomHandle>> = self.rooms.read().await.values().cloned().collect();
        let mut stats = RegistryStats::default();
        for handle in handles {
            let room = handle.state.lock().await;
            if room.is_empty() {
                continue;
            }
            stats.rooms += 1;
            stats.connections += room.members.len();
            stats.objects += room.objects.len();
            stats.comments += room.comments.len();
        }
        stats
    }

    async fn get_or_create(&self, room_id: &str) -> Arc<RoomHandle> {
        // Fast path: read lock
        if let Some(handle) = self.get(room_id).await {
            return handle;
        }

        let mut rooms = self.rooms.write().await;
        match rooms.get(room_id) {
            Some(handle) if !handle.is_closed() => handle.clone(),
            _ => {
                let handle = Arc::new(RoomHandle::new(room_id, self.stats.clone()));
                rooms.insert(room_id.to_string(), handle.clone());
                info!("Room {} created", room_id);
                handle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::models::RosterEntry;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn connect(user: &str, room: &str) -> (ConnCtx, Outbound, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(64);
        (ConnCtx::new(Identity::new(user, user.to_uppercase()), room), tx, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<str>>) -> Vec<SendMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    fn last_roster(events: &[SendMessage]) -> Vec<String> {
        events
            .iter()
            .rev()
            .find_map(|e| match e {
                SendMessage::Roster(r) => Some(r.users.iter().map(|u| u.user_id.clone()).collect()),
                _ => None,
            })
            .expect("no roster event")
    }

    #[tokio::test]
    async fn joiner_gets_snapshot_then_roster() {
        let registry = RoomRegistry::new();
        let (a, tx_a, mut rx_a) = connect("a", "file123");
        registry.join(&a, tx_a).await.unwrap();

        let events = drain(&mut rx_a);
        assert_eq!(events.len(), 2);
        match &events[0] {
            SendMessage::Snapshot(s) => {
                assert_eq!(s.connection_id, a.connection_id);
                assert_eq!(s.roster, vec![a.roster_entry()]);
                assert!(s.objects.is_empty() && s.comments.is_empty());
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert_eq!(last_roster(&events), vec!["a"]);
    }

    #[tokio::test]
    async fn join_is_idempotent_per_connection() {
        let registry = RoomRegistry::new();
        let (a, tx_a, mut rx_a) = connect("a", "r");
        let first = registry.join(&a, tx_a.clone()).await.unwrap();
        drain(&mut rx_a);

        let second = registry.join(&a, tx_a).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(registry.room_state("r").await.roster.len(), 1);
    }

    #[tokio::test]
    async fn edits_reach_peers_but_not_the_author() {
        let registry = RoomRegistry::new();
        let (a, tx_a, mut rx_a) = connect("a", "file123");
        let (b, tx_b, mut rx_b) = connect("b", "file123");
        let room = registry.join(&a, tx_a).await.unwrap();
        registry.join(&b, tx_b).await.unwrap();
        drain(&mut rx_a);
        drain(&mut rx_b);

        let record = room.apply_edit(&a, Some("obj1"), json!({"x": 10, "y": 20})).await.unwrap();
        assert_eq!(record.server_seq, 1);

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(drain(&mut rx_b), vec![SendMessage::ObjectEdit(record)]);
    }

    #[tokio::test]
    async fn late_joiner_sees_latest_objects_and_all_comments() {
        let registry = RoomRegistry::new();
        let (a, tx_a, _rx_a) = connect("a", "file123");
        let room = registry.join(&a, tx_a).await.unwrap();

        room.apply_edit(&a, Some("obj1"), json!({"x": 1})).await.unwrap();
        let latest = room.apply_edit(&a, Some("obj1"), json!({"x": 2})).await.unwrap();
        let first = room.append_comment(&a, "one", None).await.unwrap();
        let second = room.append_comment(&a, "two", Some("obj1".to_string())).await.unwrap();
        assert!(first.server_seq < second.server_seq);

        let (c, tx_c, mut rx_c) = connect("c", "file123");
        registry.join(&c, tx_c).await.unwrap();
        match drain(&mut rx_c).first() {
            Some(SendMessage::Snapshot(s)) => {
                assert_eq!(s.objects, vec![latest]);
                assert_eq!(s.comments, vec![first, second]);
                let users: Vec<&str> = s.roster.iter().map(|r| r.user_id.as_str()).collect();
                assert_eq!(users, vec!["a", "c"]);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn leave_updates_remaining_members() {
        let registry = RoomRegistry::new();
        let (a, tx_a, mut rx_a) = connect("a", "file123");
        let (b, tx_b, mut rx_b) = connect("b", "file123");
        let (c, tx_c, mut rx_c) = connect("c", "file123");
        registry.join(&a, tx_a).await.unwrap();
        registry.join(&b, tx_b).await.unwrap();
        registry.join(&c, tx_c).await.unwrap();
        assert_eq!(last_roster(&drain(&mut rx_b)), vec!["a", "b", "c"]);
        drain(&mut rx_a);
        drain(&mut rx_c);

        assert!(registry.leave(&a).await);
        assert!(!registry.leave(&a).await);

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(last_roster(&drain(&mut rx_b)), vec!["b", "c"]);
        assert_eq!(last_roster(&drain(&mut rx_c)), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn same_user_on_two_connections_appears_twice() {
        let registry = RoomRegistry::new();
        let (a1, tx1, _rx1) = connect("a", "r");
        let (a2, tx2, _rx2) = connect("a", "r");
        registry.join(&a1, tx1).await.unwrap();
        registry.join(&a2, tx2).await.unwrap();

        let roster: Vec<RosterEntry> = registry.room_state("r").await.roster;
        assert_eq!(roster, vec![a1.roster_entry(), a2.roster_entry()]);
    }

    #[tokio::test]
    async fn vacated_room_restarts_empty() {
        let registry = RoomRegistry::new();
        let (a, tx_a, _rx_a) = connect("a", "file999");
        let room = registry.join(&a, tx_a).await.unwrap();
        room.apply_edit(&a, Some("obj1"), json!({})).await.unwrap();
        room.append_comment(&a, "hello", None).await.unwrap();

        registry.leave(&a).await;
        assert!(room.is_closed());
        assert!(registry.get("file999").await.is_none());
        assert_eq!(registry.stats().await, RegistryStats::default());

        let state = registry.room_state("file999").await;
        assert!(state.objects.is_empty() && state.comments.is_empty() && state.roster.is_empty());

        // Operations through a stale handle are refused.
        assert!(room.apply_edit(&a, Some("obj2"), json!({})).await.is_err());

        let (b, tx_b, mut rx_b) = connect("b", "file999");
        let fresh = registry.join(&b, tx_b).await.unwrap();
        assert!(!Arc::ptr_eq(&room, &fresh));
        match drain(&mut rx_b).first() {
            Some(SendMessage::Snapshot(s)) => assert!(s.objects.is_empty() && s.comments.is_empty()),
            other => panic!("expected snapshot, got {other:?}"),
        }
        let comment = fresh.append_comment(&b, "again", None).await.unwrap();
        assert_eq!(comment.server_seq, 1);
    }

    #[tokio::test]
    async fn invalid_edit_does_not_mutate_or_broadcast() {
        let registry = RoomRegistry::new();
        let (a, tx_a, _rx_a) = connect("a", "r");
        let (b, tx_b, mut rx_b) = connect("b", "r");
        let room = registry.join(&a, tx_a).await.unwrap();
        registry.join(&b, tx_b).await.unwrap();
        drain(&mut rx_b);

        let result = room.apply_edit(&a, None, json!({"x": 1})).await;
        assert!(matches!(result, Err(CollabError::Validation(ValidationError::MissingObjectId))));
        assert!(drain(&mut rx_b).is_empty());
        assert!(room.state().await.objects.is_empty());
    }

    #[tokio::test]
    async fn selection_is_relayed_not_stored() {
        let registry = RoomRegistry::new();
        let (a, tx_a, mut rx_a) = connect("a", "r");
        let (b, tx_b, mut rx_b) = connect("b", "r");
        let room = registry.join(&a, tx_a).await.unwrap();
        registry.join(&b, tx_b).await.unwrap();
        drain(&mut rx_a);
        drain(&mut rx_b);

        assert_eq!(room.relay_selection(&a, Some("obj7".to_string())).await.unwrap(), 1);
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(
            drain(&mut rx_b),
            vec![SendMessage::ObjectSelect(ObjectSelectMessage {
                object_id: Some("obj7".to_string()),
                user_id: "a".to_string(),
                connection_id: a.connection_id.clone(),
            })]
        );
        assert!(room.state().await.objects.is_empty());
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let registry = RoomRegistry::new();
        let (a, tx_a, _rx_a) = connect("a", "one");
        let (b, tx_b, mut rx_b) = connect("b", "two");
        let one = registry.join(&a, tx_a).await.unwrap();
        registry.join(&b, tx_b).await.unwrap();
        drain(&mut rx_b);

        one.apply_edit(&a, Some("obj1"), json!({})).await.unwrap();
        assert!(drain(&mut rx_b).is_empty());
        assert!(registry.room_state("two").await.objects.is_empty());

        let stats = registry.stats().await;
        assert_eq!(stats.rooms, 2);
        assert_eq!(stats.connections, 2);
        assert_eq!(stats.objects, 1);
    }

    #[tokio::test]
    async fn concurrent_joins_and_leaves_keep_one_room() {
        let registry = Arc::new(RoomRegistry::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (conn, tx, _rx) = connect(&format!("u{i}"), "busy");
                registry.join(&conn, tx).await.unwrap();
                if i % 2 == 0 {
                    registry.leave(&conn).await;
                }
                conn
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let state = registry.room_state("busy").await;
        assert_eq!(state.roster.len(), 16);
        assert_eq!(registry.stats().await.rooms, 1);
    }
}
