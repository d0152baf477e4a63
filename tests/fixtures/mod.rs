//! Shared test server fixture.

use std::path::PathBuf;
use std::time::Duration;

use handraise::config::ServerConfig;

/// A real server on a fixed port with an ephemeral state file.
pub struct TestServer {
    port: u16,
    data_file: PathBuf,
}

impl TestServer {
    /// Spawn the server in the background and wait until it accepts
    /// connections. Each test uses its own port.
    pub fn start(port: u16) -> Self {
        let data_file = std::env::temp_dir().join(format!(
            "handraise-test-{}-{}.json",
            port,
            uuid::Uuid::new_v4()
        ));
        Self::start_with_data_file(port, data_file)
    }

    /// Spawn the server against a caller-owned state file, for restart
    /// scenarios.
    pub fn start_with_data_file(port: u16, data_file: PathBuf) -> Self {
        let config = ServerConfig {
            port,
            data_file: data_file.clone(),
            master_password: Some("master-secret".to_string()),
            ta_password: Some("ta-secret".to_string()),
        };
        tokio::spawn(async move {
            if let Err(e) = handraise::run_server(config).await {
                panic!("test server failed: {e}");
            }
        });
        Self { port, data_file }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    pub fn data_file(&self) -> &PathBuf {
        &self.data_file
    }

    /// Poll the health endpoint until the listener is up.
    pub async fn wait_ready(&self) {
        let client = reqwest::Client::new();
        for _ in 0..100 {
            if client
                .get(format!("{}/health", self.base_url()))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("server on port {} never became ready", self.port);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.data_file);
    }
}
