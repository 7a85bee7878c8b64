use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parlor::broadcast::RoomManager;
use parlor::config::ServerConfig;
use parlor::shared::AppState;
use parlor::user::InMemoryUserRepository;
use parlor::{room, stream, user};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting parlor chat server");

    let config = ServerConfig::from_env();

    // Explicit instances wired through state; nothing global, easy to swap
    // under test.
    let rooms = RoomManager::new(config.broker.clone());
    let user_repository = Arc::new(InMemoryUserRepository::new());
    let app_state = AppState::new(rooms, user_repository);

    let app = Router::new()
        .route("/rooms", get(room::list_rooms))
        .route(
            "/rooms/:room_id",
            get(room::get_room).delete(room::delete_room),
        )
        .route("/rooms/:room_id/messages", post(room::submit_message))
        .route("/rooms/:room_id/stream", get(stream::stream_room))
        .route("/users", get(user::list_users).post(user::create_user))
        .route("/users/:user_id", delete(user::remove_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await.unwrap();
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await.unwrap();
}
