use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::errors::InternalError;
use crate::models::SendMessage;
use super::room::Member;

/// Pre-encoded frames waiting for a connection's writer task.
pub type Outbound = mpsc::Sender<Arc<str>>;

/// Lock-free delivery counters shared by every room.
#[derive(Debug, Default)]
pub struct BroadcastStats {
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl BroadcastStats {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub fn encode(event: &SendMessage) -> Result<Arc<str>, InternalError> {
    Ok(Arc::from(serde_json::to_string(event)?))
}

/// Deliver `event` to every member except `exclude`.
///
/// The event is serialized once. Each recipient gets a non-blocking enqueue, so a peer
/// whose queue is full loses this event instead of holding up the room.
/// Returns how many recipients accepted it.
pub fn fanout(members: &[Member], event: &SendMessage, exclude: Option<&str>, stats: &BroadcastStats) -> Result<usize, InternalError> {
    let frame = encode(event)?;
    let delivered = members
        .iter()
        .filter(|m| Some(m.conn.connection_id.as_str()) != exclude)
        .filter(|m| deliver(m, frame.clone(), stats))
        .count();
    Ok(delivered)
}

/// Deliver `event` to a single member.
pub fn send_to(member: &Member, event: &SendMessage, stats: &BroadcastStats) -> Result<bool, InternalError> {
    let frame = encode(event)?;
    Ok(deliver(member, frame, stats))
}

fn deliver(member: &Member, frame: Arc<str>, stats: &BroadcastStats) -> bool {
    match member.outbound.try_send(frame) {
        Ok(()) => {
            stats.sent.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(TrySendError::Full(_)) => {
            stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Outbound queue full for connection {} in room {}, dropping event",
                member.conn.connection_id, member.conn.room_id
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            stats.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("Connection {} already closed, skipping event", member.conn.connection_id);
            false
        }
    }
}
