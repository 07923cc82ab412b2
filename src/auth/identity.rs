use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::ErrorResponse;

const CLOUD_ADMIN_ROLE: &str = "CloudAdmin";

/// The verified identity behind a connection. Resolved once at connect time and never changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            roles: Vec::new(),
        }
    }

    pub fn is_cloud_admin(&self) -> bool {
        self.roles.iter().any(|r| r == CLOUD_ADMIN_ROLE)
    }
}

pub fn ensure_cloud_admin(identity: &Identity) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if identity.is_cloud_admin() {
        return Ok(());
    }

    let status = StatusCode::FORBIDDEN;
    Err((status, Json(ErrorResponse {
        code: status.as_u16(),
        status: status.to_string(),
        error: "Cloud Admin access required".to_string(),
    })))
}
