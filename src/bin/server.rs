//! Office-hours queue server with live WebSocket updates.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin handraise-server
//! ```

use clap::Parser;

use handraise::config::ServerConfig;
use handraise::logger::setup_logger;

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger("debug");

    let config = ServerConfig::parse();

    // Run the server
    if let Err(e) = handraise::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
