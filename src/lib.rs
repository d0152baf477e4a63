//! Real-time office-hours queue server library.
//!
//! Students join a room's marking or question queue, a TA calls and assists
//! them, and every connected client sees live state over WebSocket.

pub mod common;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logger;
pub mod ui;
pub mod usecase;

// Re-export entry point
pub use ui::run_server;
