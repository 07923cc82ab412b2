use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Latest edit applied to one object of a room.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub object_id: String,
    #[schema(value_type = Object)]
    pub payload: Value,
    pub author_id: String,
    pub server_seq: u64,
}

/// A comment appended to a room's log. Immutable once created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_object_id: Option<String>,
    pub server_seq: u64,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: String,
    pub display_name: String,
    pub connection_id: String,
}

/// Object ids arrive either as strings or as numeric viewer ids.
pub fn deserialize_object_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
