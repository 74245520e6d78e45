//! Test server lifecycle management
//!
//! Each test gets its own gateway on a random port, wired to its own
//! in-memory Odoo backend.

use super::constants::*;
use super::fixtures::{FakeOdoo, FakeOdooConnector};
use odoo_mcp_gateway::config::{AppConfig, CliConfig};
use odoo_mcp_gateway::server::{build_state, serve, RequestsLoggingLevel};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Running gateway. Shuts down when dropped.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Backend the gateway talks to
    pub odoo: Arc<FakeOdoo>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with("readwrite", FakeOdoo::new()).await
    }

    pub async fn spawn_readonly() -> Self {
        Self::spawn_with("readonly", FakeOdoo::new()).await
    }

    /// Spawns a gateway in `mode` in front of `odoo`
    ///
    /// # Panics
    ///
    /// Panics if the configuration is rejected, the port cannot be bound or
    /// the server does not become ready in time.
    pub async fn spawn_with(mode: &str, odoo: Arc<FakeOdoo>) -> Self {
        let cli = CliConfig {
            mode: mode.to_string(),
            logging_level: RequestsLoggingLevel::None,
            server_name: SERVER_NAME.to_string(),
            stream_chunk_size: STREAM_CHUNK_SIZE,
            rate_limit_write_requests: WRITE_LIMIT,
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, None).expect("Failed to resolve config");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = build_state(&config, Arc::new(FakeOdooConnector(odoo.clone())))
            .expect("Failed to build server state");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            serve(listener, state, async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            odoo,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    /// Polls `/health` until it answers
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);
        let url = format!("{}/health", self.base_url);

        while start.elapsed() < timeout {
            if let Ok(response) = client.get(&url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        panic!("Server did not become ready within {:?}", timeout);
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/mcp/ws", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
