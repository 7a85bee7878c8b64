// Library crate for the parlor chat server
// This file exposes the public API for integration tests

pub mod broadcast;
pub mod config;
pub mod room;
pub mod shared;
pub mod stream;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use broadcast::{Broadcaster, BrokerError, ListenerHandle, Message, RoomInfo, RoomManager};
pub use config::{BrokerConfig, ReaperConfig, ServerConfig};
pub use shared::{AppError, AppState};
pub use user::{InMemoryUserRepository, UserModel, UserRepository};
