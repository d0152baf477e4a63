//! HTTP + WebSocket server surface.

pub mod handler;
pub mod runner;
pub mod sessions;
pub mod signal;
pub mod state;

pub use runner::run_server;
