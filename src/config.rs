//! Server configuration.

use std::path::PathBuf;

use clap::Parser;

/// Command line / environment configuration for the queue server.
#[derive(Debug, Clone, Parser)]
#[command(name = "handraise-server", about = "Real-time office-hours queue server")]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "HANDRAISE_PORT", default_value_t = 3001)]
    pub port: u16,

    /// Path of the persisted queue state file
    #[arg(long, env = "HANDRAISE_DATA_FILE", default_value = "queues.json")]
    pub data_file: PathBuf,

    /// Master secret required to claim a room password.
    /// When unset, /api/claim-room always responds 401.
    #[arg(long, env = "HANDRAISE_MASTER_PASSWORD")]
    pub master_password: Option<String>,

    /// Shared TA secret validated by /api/ta-auth.
    /// When unset, /api/ta-auth always responds 401.
    #[arg(long, env = "HANDRAISE_TA_PASSWORD")]
    pub ta_password: Option<String>,
}
