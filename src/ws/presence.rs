use tracing::debug;
use crate::errors::InternalError;
use crate::models::{RosterMessage, SendMessage};
use super::broadcaster::{self, BroadcastStats};
use super::room::Room;

/// Send the full current roster to every member of the room.
pub fn announce(room_id: &str, room: &Room, stats: &BroadcastStats) -> Result<usize, InternalError> {
    let users = room.roster();
    debug!("Roster for room {} now has {} entries", room_id, users.len());
    broadcaster::fanout(&room.members, &SendMessage::Roster(RosterMessage { users }), None, stats)
}
