// Public API - what other modules can use
pub use handlers::{stream_room, MessageStream};

// Internal modules
mod events;
mod handlers;
