//! Server assembly and lifecycle.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::{FileStore, QueueStore};
use crate::ui::handler;
use crate::ui::signal::shutdown_signal;
use crate::ui::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handler::health_check))
        .route("/api/rooms", get(handler::get_rooms))
        .route("/api/room-status", get(handler::room_status))
        .route("/api/user-status", get(handler::user_status))
        .route("/api/claim-room", post(handler::claim_room))
        .route("/api/room-auth", post(handler::room_auth))
        .route("/api/ta-auth", post(handler::ta_auth))
        .route("/ws", get(handler::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load persisted state, serve until a shutdown signal, then flush any
/// pending write before returning.
pub async fn run_server(config: ServerConfig) -> Result<(), std::io::Error> {
    let config = Arc::new(config);
    let store: Arc<dyn QueueStore> = Arc::new(FileStore::new(config.data_file.clone()));

    // State must be on disk-truth before the first client connects.
    let rooms = store.load().await;
    tracing::info!("Loaded {} room(s) from {}", rooms.len(), config.data_file.display());

    let state = AppState::new(Arc::clone(&config), Arc::clone(&store), RoomRegistry::from_rooms(rooms));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // A coalesced write may still be in flight.
    store.flush().await;
    tracing::info!("Server stopped");
    Ok(())
}
