use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::{Comment, EditRecord, RosterEntry};

/// Current shared state of a room. Empty when nobody is connected to it.
#[derive(Serialize, Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateResponse {
    pub room_id: String,
    pub objects: Vec<EditRecord>,
    pub comments: Vec<Comment>,
    pub roster: Vec<RosterEntry>,
}
