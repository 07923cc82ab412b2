use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::models::collab::{deserialize_object_id, Comment, EditRecord, RosterEntry};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEditRequest {
    #[serde(default, deserialize_with = "deserialize_object_id")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSelectRequest {
    #[serde(default, deserialize_with = "deserialize_object_id")]
    pub object_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "objectId", deserialize_with = "deserialize_object_id")]
    pub target_object_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PingMessage {}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "object-edit")]
    ObjectEdit(ObjectEditRequest),
    #[serde(rename = "object-select")]
    ObjectSelect(ObjectSelectRequest),
    #[serde(rename = "comment")]
    Comment(CommentRequest),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    /// The joiner's own connection id
    pub connection_id: String,
    pub objects: Vec<EditRecord>,
    pub comments: Vec<Comment>,
    pub roster: Vec<RosterEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RosterMessage {
    pub users: Vec<RosterEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSelectMessage {
    /// `None` means the user cleared their selection
    pub object_id: Option<String>,
    pub user_id: String,
    pub connection_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "snapshot")]
    Snapshot(SnapshotMessage),
    #[serde(rename = "roster")]
    Roster(RosterMessage),
    #[serde(rename = "object-edit")]
    ObjectEdit(EditRecord),
    #[serde(rename = "object-select")]
    ObjectSelect(ObjectSelectMessage),
    #[serde(rename = "comment")]
    Comment(Comment),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}
