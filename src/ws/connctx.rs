use uuid::Uuid;
use crate::auth::Identity;
use crate::models::RosterEntry;

/// One live connection: who it is and which room it is bound to.
/// Both are fixed when the connection is accepted.
#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub connection_id: String,
    pub identity: Identity,
    pub room_id: String,
}

impl ConnCtx {
    pub fn new(identity: Identity, room_id: impl Into<String>) -> Self {
        Self {
            connection_id: Uuid::new_v4().to_string(),
            identity,
            room_id: room_id.into(),
        }
    }

    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            user_id: self.identity.user_id.clone(),
            display_name: self.identity.display_name.clone(),
            connection_id: self.connection_id.clone(),
        }
    }
}
