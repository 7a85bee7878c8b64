use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::broadcast::{BrokerError, RoomManager};
use crate::user::repository::UserRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomManager,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
}

impl AppState {
    pub fn new(
        rooms: RoomManager,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self {
            rooms,
            user_repository,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("room is busy: {0}")]
    RoomBusy(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable")]
    Unavailable,

    #[error("internal server error")]
    Internal,
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::QueueFull => AppError::RoomBusy("message queue is full".to_string()),
            BrokerError::RoomNotFound(room_id) => AppError::NotFound(format!("room {room_id}")),
            BrokerError::BroadcasterClosed => AppError::Unavailable,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::RoomBusy(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service unavailable".to_string(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
