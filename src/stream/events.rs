use serde::Serialize;

use crate::broadcast::Message;

/// Wire rendering of one delivered message. The broker itself never
/// serializes anything; this is the stream adapter's framing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub user_id: String,
    pub room_id: String,
    pub text: String,
}

impl From<Message> for ChatEvent {
    fn from(message: Message) -> Self {
        Self {
            user_id: message.user_id,
            room_id: message.room_id,
            text: message.text,
        }
    }
}
