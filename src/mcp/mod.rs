//! MCP (Model Context Protocol) Gateway
//!
//! Exposes a fixed catalog of Odoo tools and resources to LLM clients and
//! gates every invocation on the configured operating mode.
//!
//! ## Architecture
//!
//! - Catalog: static tool and resource definitions
//! - Permissions: readonly / readwrite policy checked before dispatch
//! - Gateway: catalog + permissions + handler registry over the Odoo client
//! - Streaming: tool results as start / chunk / end|error events
//! - Transports: REST and SSE routes, JSON-RPC over `POST /mcp` and `/mcp/ws`

pub mod catalog;
pub mod context;
pub mod gateway;
pub mod handler;
pub mod permissions;
pub mod protocol;
pub mod rate_limit;
pub mod registry;
pub mod resources;
pub mod streaming;
pub mod tools;

pub use catalog::Catalog;
pub use gateway::ToolGateway;
pub use handler::{mcp_rpc_handler, mcp_ws_handler, McpState};
pub use permissions::{ModeInfo, OperatingMode, PermissionLevel, PermissionManager};
pub use protocol::{McpError, McpRequest, McpResponse};
pub use registry::McpRegistry;
pub use streaming::{StreamEvent, StreamingEncoder};
