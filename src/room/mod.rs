// Public API - what other modules can use
pub use handlers::{delete_room, get_room, list_rooms, submit_message};

// Internal modules
mod handlers;
mod types;
