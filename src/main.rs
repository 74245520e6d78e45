use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use odoo_mcp_gateway::config::{AppConfig, CliConfig, FileConfig, OdooArgs};
use odoo_mcp_gateway::odoo::JsonRpcConnector;
use odoo_mcp_gateway::server::{run_server, RequestsLoggingLevel};

#[derive(Parser, Debug)]
#[command(version, about = "Permission-gated MCP gateway for Odoo")]
struct CliArgs {
    #[clap(flatten)]
    pub odoo: OdooArgs,

    /// Operating mode, either `readonly` or `readwrite`.
    #[clap(long, env = "MCP_MODE", default_value = "readwrite")]
    pub mode: String,

    /// The address to bind.
    #[clap(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, env = "SERVER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Name reported to MCP clients during initialization.
    #[clap(long, env = "MCP_SERVER_NAME", default_value = "odoo-mcp-server")]
    pub server_name: String,

    /// Number of records per streamed chunk.
    #[clap(long, env = "STREAM_CHUNK_SIZE", default_value_t = 10)]
    pub stream_chunk_size: usize,

    /// Read calls allowed per client per window.
    #[clap(long, env = "RATE_LIMIT_REQUESTS", default_value_t = 100)]
    pub rate_limit_requests: u32,

    /// Write calls allowed per client per window.
    #[clap(long, env = "RATE_LIMIT_WRITE_REQUESTS", default_value_t = 30)]
    pub rate_limit_write_requests: u32,

    /// Rate limit window in seconds.
    #[clap(long = "rate-limit-window", env = "RATE_LIMIT_WINDOW", default_value_t = 60)]
    pub rate_limit_window_sec: u64,

    /// Comma separated list of allowed CORS origins, `*` for any.
    #[clap(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Optional TOML file whose values override the command line.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            odoo: self.odoo.clone(),
            mode: self.mode.clone(),
            host: self.host.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            server_name: self.server_name.clone(),
            stream_chunk_size: self.stream_chunk_size,
            rate_limit_requests: self.rate_limit_requests,
            rate_limit_write_requests: self.rate_limit_write_requests,
            rate_limit_window_sec: self.rate_limit_window_sec,
            cors_origins: self.cors_origins.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    info!("Starting Odoo MCP gateway: {}", config.summary());

    let connector = Arc::new(JsonRpcConnector::new(&config.odoo.url, config.odoo.timeout));
    run_server(config, connector).await
}
