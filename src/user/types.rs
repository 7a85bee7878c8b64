use serde::{Deserialize, Serialize};

/// Request payload for registering a new user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
}

/// Response for a freshly registered user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedResponse {
    pub user_id: String,
}
