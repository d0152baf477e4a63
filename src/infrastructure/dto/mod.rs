//! Data transfer objects for the HTTP and WebSocket surfaces.

pub mod http;
pub mod ws;
