use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::models::UserModel;
use super::types::{CreateUserRequest, UserCreatedResponse};
use crate::shared::{AppError, AppState};

/// HTTP handler for listing all known users
///
/// GET /users
#[instrument(name = "list_users", skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserModel>>, AppError> {
    let users = state.user_repository.get_all_users().await?;

    info!(user_count = users.len(), "Users listed");
    Ok(Json(users))
}

/// HTTP handler for registering a new user
///
/// POST /users
/// Returns the generated user id.
#[instrument(name = "create_user", skip(state, request))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserCreatedResponse>), AppError> {
    let user = UserModel::new(request.username);
    state.user_repository.add_user(&user).await?;

    info!(user_id = %user.id, username = %user.username, "User created");
    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse { user_id: user.id }),
    ))
}

/// HTTP handler for removing a user
///
/// DELETE /users/{user_id}
/// Idempotent; removing an unknown user still answers 200.
#[instrument(name = "remove_user", skip(state))]
pub async fn remove_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.user_repository.remove_user(&user_id).await?;

    info!(user_id = %user_id, "User removed");
    Ok(Json(json!({ "message": "User removed" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::RoomManager;
    use crate::config::BrokerConfig;
    use crate::user::InMemoryUserRepository;
    use axum::{
        body::Body,
        http::Request,
        routing::{delete, get},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        let state = AppState::new(
            RoomManager::new(BrokerConfig::default()),
            Arc::new(InMemoryUserRepository::new()),
        );
        Router::new()
            .route("/users", get(list_users).post(create_user))
            .route("/users/:user_id", delete(remove_user))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_create_user_handler() {
        let app = app();

        let request = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username": "alice"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: UserCreatedResponse = serde_json::from_slice(&body).unwrap();
        assert!(!created.user_id.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list_users() {
        let app = app();

        let create = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username": "bob"}"#))
            .unwrap();
        app.clone().oneshot(create).await.unwrap();

        let list = Request::builder()
            .uri("/users")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(list).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let users: Vec<UserModel> = serde_json::from_slice(&body).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "bob");
    }

    #[tokio::test]
    async fn test_remove_unknown_user_is_ok() {
        let app = app();

        let request = Request::builder()
            .method("DELETE")
            .uri("/users/ghost")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
