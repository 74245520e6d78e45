//! Odoo MCP Gateway Library
//!
//! Permission-gated MCP tool gateway in front of an Odoo backend. The modules
//! are exposed for the binaries and the integration tests.

pub mod config;
pub mod mcp;
pub mod odoo;
pub mod server;

pub use config::AppConfig;
pub use server::{run_server, RequestsLoggingLevel};
