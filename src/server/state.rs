use axum::extract::FromRef;

use crate::mcp::gateway::ToolGateway;
use crate::mcp::handler::McpState;
use std::sync::Arc;

use super::ServerConfig;

pub type GuardedMcpState = Arc<McpState>;
pub type GuardedGateway = Arc<ToolGateway>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub mcp_state: GuardedMcpState,
}

impl ServerState {
    pub fn new(config: ServerConfig, mcp_state: GuardedMcpState) -> Self {
        Self {
            config,
            mcp_state,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedMcpState {
    fn from_ref(input: &ServerState) -> Self {
        input.mcp_state.clone()
    }
}

impl FromRef<ServerState> for GuardedGateway {
    fn from_ref(input: &ServerState) -> Self {
        input.mcp_state.gateway.clone()
    }
}
