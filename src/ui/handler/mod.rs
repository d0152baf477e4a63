//! Handler modules for HTTP and WebSocket endpoints.

pub mod http;
pub mod websocket;

// Re-export HTTP handlers
pub use http::{
    claim_room, get_rooms, health_check, room_auth, room_status, ta_auth, user_status,
};

// Re-export WebSocket handlers
pub use websocket::websocket_handler;
