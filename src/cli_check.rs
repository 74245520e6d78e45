use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::sync::Arc;

use odoo_mcp_gateway::config::{validate_odoo, OdooArgs};
use odoo_mcp_gateway::mcp::OperatingMode;
use odoo_mcp_gateway::odoo::{JsonRpcConnector, OdooClient, OdooConfig, RpcConnector};

#[derive(Parser, Debug)]
#[command(version, about = "Checks and setup helpers for the Odoo MCP gateway")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connects to Odoo, authenticates and counts the installed models.
    Connection {
        #[clap(flatten)]
        odoo: OdooArgs,
    },

    /// Prints an `mcpServers` entry pointing a desktop client at the gateway.
    ClaudeConfig {
        /// Key of the entry in `mcpServers`.
        #[clap(long, default_value = "odoo")]
        name: String,

        /// Base URL the gateway is reachable at.
        #[clap(long, default_value = "http://localhost:8000")]
        url: String,

        /// Mode the gateway is started in.
        #[clap(long, default_value = "readwrite")]
        mode: String,
    },
}

fn odoo_config(args: &OdooArgs) -> Result<OdooConfig> {
    let config = OdooConfig {
        url: args.url.clone(),
        database: args.database.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
        timeout: std::time::Duration::from_secs(args.timeout_sec),
    };
    validate_odoo(&config)?;
    Ok(config)
}

async fn check_connection(args: &OdooArgs) -> Result<()> {
    let config = odoo_config(args)?;
    println!("Checking {} (db {}, user {})", config.url, config.database, config.username);

    let connector = Arc::new(JsonRpcConnector::new(&config.url, config.timeout));
    let opener = connector.clone();
    let version = tokio::task::spawn_blocking(move || -> Result<Value> {
        let transport = opener.open()?;
        Ok(transport.call("common", "version", Vec::new())?)
    })
    .await
    .context("version request did not complete")??;
    let server_version = version
        .get("server_version")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    println!("  server version: {}", server_version);

    let client = OdooClient::new(config, connector);
    let uid = client.authenticate().await?;
    println!("  authenticated as uid {}", uid);

    let models = client.list_models().await?;
    let count = models
        .as_array()
        .map(Vec::len)
        .ok_or_else(|| anyhow!("unexpected model list: {}", models))?;
    println!("  {} models available", count);

    client.close().await;
    Ok(())
}

fn claude_config(name: &str, url: &str, mode: &str) -> Result<Value> {
    let mode: OperatingMode = mode.parse()?;
    if url.trim().is_empty() {
        bail!("url must not be empty");
    }

    let mut entry = json!({
        "url": format!("{}/mcp", url.trim_end_matches('/')),
        "transport": "http",
    });
    if mode != OperatingMode::ReadWrite {
        entry["env"] = json!({ "MCP_MODE": mode.as_str() });
    }

    Ok(json!({ "mcpServers": { name: entry } }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    match cli_args.command {
        Command::Connection { odoo } => {
            if let Err(err) = check_connection(&odoo).await {
                eprintln!("Connection check failed: {:#}", err);
                std::process::exit(1);
            }
            println!("Connection OK");
        }
        Command::ClaudeConfig { name, url, mode } => {
            let config = claude_config(&name, &url, &mode)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_config_points_at_rpc_route() {
        let config = claude_config("odoo-prod", "http://gw:8000/", "readonly").unwrap();

        let entry = &config["mcpServers"]["odoo-prod"];
        assert_eq!(entry["url"], json!("http://gw:8000/mcp"));
        assert_eq!(entry["env"]["MCP_MODE"], json!("readonly"));
    }

    #[test]
    fn claude_config_omits_env_for_default_mode() {
        let config = claude_config("odoo", "http://localhost:8000", "readwrite").unwrap();

        assert!(config["mcpServers"]["odoo"].get("env").is_none());
    }

    #[test]
    fn claude_config_rejects_unknown_mode() {
        assert!(claude_config("odoo", "http://gw:8000", "admin").is_err());
    }
}
