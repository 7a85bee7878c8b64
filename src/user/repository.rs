use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::UserModel;
use crate::shared::AppError;

/// Trait for user registry operations
#[async_trait]
pub trait UserRepository {
    async fn add_user(&self, user: &UserModel) -> Result<(), AppError>;
    /// Removing an unknown user is a silent no-op.
    async fn remove_user(&self, user_id: &str) -> Result<(), AppError>;
    async fn get_user_by_id(&self, user_id: &str) -> Result<UserModel, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<UserModel, AppError>;
    async fn get_all_users(&self) -> Result<Vec<UserModel>, AppError>;
}

/// In-memory implementation of UserRepository for a single-process
/// deployment; nothing survives a restart.
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn add_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, username = %user.username, "Adding user");

        let mut users = self.users.lock().map_err(|_| AppError::Internal)?;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_user(&self, user_id: &str) -> Result<(), AppError> {
        debug!(user_id = %user_id, "Removing user");

        let mut users = self.users.lock().map_err(|_| AppError::Internal)?;
        users.remove(user_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user_by_id(&self, user_id: &str) -> Result<UserModel, AppError> {
        let users = self.users.lock().map_err(|_| AppError::Internal)?;
        users
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
    }

    #[instrument(skip(self))]
    async fn get_user_by_username(&self, username: &str) -> Result<UserModel, AppError> {
        let users = self.users.lock().map_err(|_| AppError::Internal)?;
        users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {username}")))
    }

    #[instrument(skip(self))]
    async fn get_all_users(&self) -> Result<Vec<UserModel>, AppError> {
        let users = self.users.lock().map_err(|_| AppError::Internal)?;
        Ok(users.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_get_user() {
        let repo = InMemoryUserRepository::new();
        let user = UserModel::new("alice");

        repo.add_user(&user).await.unwrap();

        let fetched = repo.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(fetched, user);
    }

    #[tokio::test]
    async fn test_get_user_by_username() {
        let repo = InMemoryUserRepository::new();
        let user = UserModel::new("bob");
        repo.add_user(&user).await.unwrap();

        let fetched = repo.get_user_by_username("bob").await.unwrap();
        assert_eq!(fetched.id, user.id);

        let missing = repo.get_user_by_username("nobody").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_user_is_idempotent() {
        let repo = InMemoryUserRepository::new();
        let user = UserModel::new("carol");
        repo.add_user(&user).await.unwrap();

        repo.remove_user(&user.id).await.unwrap();
        repo.remove_user(&user.id).await.unwrap();

        assert!(repo.get_user_by_id(&user.id).await.is_err());
    }

    #[tokio::test]
    async fn test_get_all_users() {
        let repo = InMemoryUserRepository::new();
        repo.add_user(&UserModel::new("alice")).await.unwrap();
        repo.add_user(&UserModel::new("bob")).await.unwrap();

        let users = repo.get_all_users().await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
