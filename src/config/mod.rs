mod file_config;

pub use file_config::{FileConfig, OdooFileConfig, RateLimitFileConfig};

use crate::mcp::permissions::OperatingMode;
use crate::mcp::rate_limit::RateLimitConfig;
use crate::odoo::OdooConfig;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;

/// Backend connection flags, shared by every binary.
#[derive(clap::Args, Debug, Clone)]
pub struct OdooArgs {
    /// Base URL of the Odoo server.
    #[clap(long = "odoo-url", env = "ODOO_URL", default_value = "http://localhost:8069")]
    pub url: String,

    /// Database to authenticate against.
    #[clap(long = "odoo-database", env = "ODOO_DATABASE", default_value = "odoo")]
    pub database: String,

    /// Login of the Odoo user every call runs as.
    #[clap(long = "odoo-username", env = "ODOO_USERNAME", default_value = "admin")]
    pub username: String,

    #[clap(
        long = "odoo-password",
        env = "ODOO_PASSWORD",
        default_value = "admin",
        hide_env_values = true
    )]
    pub password: String,

    /// Timeout in seconds for each backend request.
    #[clap(long = "odoo-timeout", env = "ODOO_TIMEOUT", default_value_t = 30)]
    pub timeout_sec: u64,
}

impl Default for OdooArgs {
    fn default() -> Self {
        Self {
            url: "http://localhost:8069".to_string(),
            database: "odoo".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            timeout_sec: 30,
        }
    }
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub odoo: OdooArgs,
    pub mode: String,
    pub host: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub server_name: String,
    pub stream_chunk_size: usize,
    pub rate_limit_requests: u32,
    pub rate_limit_write_requests: u32,
    pub rate_limit_window_sec: u64,
    pub cors_origins: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            odoo: OdooArgs::default(),
            mode: "readwrite".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            logging_level: RequestsLoggingLevel::default(),
            server_name: "odoo-mcp-server".to_string(),
            stream_chunk_size: 10,
            rate_limit_requests: 100,
            rate_limit_write_requests: 30,
            rate_limit_window_sec: 60,
            cors_origins: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub odoo: OdooConfig,
    pub mode: OperatingMode,
    pub host: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub server_name: String,
    pub stream_chunk_size: usize,
    pub rate_limit: RateLimitConfig,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let odoo_file = file.odoo.unwrap_or_default();
        let rate_file = file.rate_limit.unwrap_or_default();

        let odoo = OdooConfig {
            url: odoo_file.url.unwrap_or_else(|| cli.odoo.url.clone()),
            database: odoo_file
                .database
                .unwrap_or_else(|| cli.odoo.database.clone()),
            username: odoo_file
                .username
                .unwrap_or_else(|| cli.odoo.username.clone()),
            password: odoo_file
                .password
                .unwrap_or_else(|| cli.odoo.password.clone()),
            timeout: Duration::from_secs(odoo_file.timeout_sec.unwrap_or(cli.odoo.timeout_sec)),
        };
        validate_odoo(&odoo)?;

        let mode_str = file.mode.unwrap_or_else(|| cli.mode.clone());
        let mode: OperatingMode = mode_str.parse()?;

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        if host.trim().is_empty() {
            bail!("host must not be empty");
        }
        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let server_name = file
            .server_name
            .unwrap_or_else(|| cli.server_name.clone());
        let stream_chunk_size = file.stream_chunk_size.unwrap_or(cli.stream_chunk_size);

        let rate_limit = RateLimitConfig {
            read_per_window: rate_file.requests.unwrap_or(cli.rate_limit_requests),
            write_per_window: rate_file
                .write_requests
                .unwrap_or(cli.rate_limit_write_requests),
            window: Duration::from_secs(rate_file.window_sec.unwrap_or(cli.rate_limit_window_sec)),
        };
        if rate_limit.window.is_zero() {
            bail!("rate limit window must be at least one second");
        }

        let cors_origins = file
            .cors_origins
            .unwrap_or_else(|| parse_cors_origins(&cli.cors_origins));

        Ok(Self {
            odoo,
            mode,
            host,
            port,
            logging_level,
            server_name,
            stream_chunk_size,
            rate_limit,
            cors_origins,
        })
    }

    /// Human-readable configuration summary. Never includes the password.
    pub fn summary(&self) -> String {
        format!(
            "Odoo {} (db {}, user {}), mode {}, listening on {}:{}, stream chunk {}, \
             rate limit {}/{} per {}s",
            self.odoo.url,
            self.odoo.database,
            self.odoo.username,
            self.mode,
            self.host,
            self.port,
            self.stream_chunk_size,
            self.rate_limit.read_per_window,
            self.rate_limit.write_per_window,
            self.rate_limit.window.as_secs()
        )
    }
}

/// Backend settings must all be present and the URL must be http(s).
pub fn validate_odoo(odoo: &OdooConfig) -> Result<()> {
    let required = [
        ("Odoo URL", &odoo.url),
        ("Odoo database", &odoo.database),
        ("Odoo username", &odoo.username),
        ("Odoo password", &odoo.password),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            bail!("{} must be set", name);
        }
    }

    let host = odoo
        .url
        .strip_prefix("http://")
        .or_else(|| odoo.url.strip_prefix("https://"));
    match host {
        Some(rest) if !rest.trim_matches('/').is_empty() => Ok(()),
        _ => bail!(
            "Odoo URL must start with http:// or https:// and name a host: {}",
            odoo.url
        ),
    }
}

/// Splits a comma separated origin list, dropping blanks.
pub fn parse_cors_origins(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();

        assert_eq!(config.odoo.url, "http://localhost:8069");
        assert_eq!(config.odoo.database, "odoo");
        assert_eq!(config.odoo.timeout, Duration::from_secs(30));
        assert_eq!(config.mode, OperatingMode::ReadWrite);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.server_name, "odoo-mcp-server");
        assert_eq!(config.stream_chunk_size, 10);
        assert_eq!(config.rate_limit.read_per_window, 100);
        assert_eq!(config.rate_limit.write_per_window, 30);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.cors_origins, vec!["*"]);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            mode: "readwrite".to_string(),
            port: 8001,
            rate_limit_requests: 50,
            cors_origins: "http://cli.example".to_string(),
            ..Default::default()
        };

        let file_config = FileConfig {
            mode: Some("readonly".to_string()),
            logging_level: Some("headers".to_string()),
            cors_origins: Some(vec!["http://toml.example".to_string()]),
            odoo: Some(OdooFileConfig {
                database: Some("prod".to_string()),
                ..Default::default()
            }),
            rate_limit: Some(RateLimitFileConfig {
                write_requests: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.mode, OperatingMode::ReadOnly);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.cors_origins, vec!["http://toml.example"]);
        assert_eq!(config.odoo.database, "prod");
        assert_eq!(config.rate_limit.write_per_window, 3);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.port, 8001);
        assert_eq!(config.odoo.url, "http://localhost:8069");
        assert_eq!(config.rate_limit.read_per_window, 50);
    }

    #[test]
    fn test_resolve_invalid_mode() {
        let cli = CliConfig {
            mode: "admin".to_string(),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Invalid mode"));
    }

    #[test]
    fn test_resolve_rejects_bad_url() {
        let cli = CliConfig {
            odoo: OdooArgs {
                url: "ftp://odoo.example".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));

        let cli = CliConfig {
            odoo: OdooArgs {
                url: "https://".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_resolve_rejects_empty_required_setting() {
        let file_config = FileConfig {
            odoo: Some(OdooFileConfig {
                password: Some("".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = AppConfig::resolve(&CliConfig::default(), Some(file_config)).unwrap_err();
        assert!(err.to_string().contains("Odoo password must be set"));
    }

    #[test]
    fn test_summary_hides_password() {
        let cli = CliConfig {
            odoo: OdooArgs {
                password: "hunter2".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        let summary = config.summary();
        assert!(!summary.contains("hunter2"));
        assert!(summary.contains("mode readwrite"));
    }

    #[test]
    fn test_parse_cors_origins() {
        assert_eq!(
            parse_cors_origins(" http://a.example , ,http://b.example"),
            vec!["http://a.example", "http://b.example"]
        );
        assert!(parse_cors_origins("").is_empty());
    }
}
