// Public API - what other modules can use
pub use handlers::{create_user, list_users, remove_user};
pub use models::UserModel;
pub use repository::{InMemoryUserRepository, UserRepository};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod types;
