use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat participant known to this server instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    pub id: String,
    pub username: String,
}

impl UserModel {
    /// Creates a user with a freshly generated id.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
        }
    }
}
