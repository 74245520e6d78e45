pub mod config;
mod http_layers;
mod mcp_routes;
mod odoo_routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{build_state, make_app, run_server, serve};
