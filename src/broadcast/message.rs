/// A single chat message submitted to a room.
///
/// Immutable once constructed. The broker attaches no timestamp and does no
/// wire serialization; rendering a delivered message into a transport frame
/// is the stream adapter's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub user_id: String,
    pub room_id: String,
    pub text: String,
}

impl Message {
    pub fn new(
        user_id: impl Into<String>,
        room_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            room_id: room_id.into(),
            text: text.into(),
        }
    }
}
