use serde::{Deserialize, Serialize};

use crate::broadcast::RoomInfo;

/// Request payload for posting a message into a room
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageRequest {
    pub user_id: String,
    pub text: String,
}

/// Response describing one active room
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: String,
    pub listeners: usize,
}

impl From<RoomInfo> for RoomResponse {
    fn from(info: RoomInfo) -> Self {
        Self {
            id: info.room_id,
            listeners: info.listeners,
        }
    }
}
