//! MCP JSON-RPC Handler
//!
//! Dispatches JSON-RPC messages to the gateway. Shared by the WebSocket
//! transport, which keeps per-connection session state, and the stateless
//! `POST /mcp` route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::gateway::ToolGateway;
use super::protocol::{
    methods, InitializeParams, InitializeResult, McpError, McpRequest, McpResponse, PingResult,
    ResourcesListResult, ResourcesReadParams, ResourcesReadResult, ServerInfo, ToolsCallParams,
    ToolsListResult, MCP_PROTOCOL_VERSION,
};
use super::rate_limit::{McpRateLimiter, ToolCategory};
use super::streaming::{StreamEvent, StreamingEncoder};
use crate::server::state::GuardedMcpState;

/// State shared across MCP connections and routes
pub struct McpState {
    pub gateway: Arc<ToolGateway>,
    pub rate_limiter: Arc<McpRateLimiter>,
    pub encoder: StreamingEncoder,
    pub server_name: String,
}

impl McpState {
    pub fn new(
        gateway: Arc<ToolGateway>,
        rate_limiter: Arc<McpRateLimiter>,
        encoder: StreamingEncoder,
        server_name: impl Into<String>,
    ) -> Self {
        let server_name = server_name.into();
        info!(
            "MCP server {} ready with {} tools and {} resources",
            server_name,
            gateway.list_tools().len(),
            gateway.list_resources().len()
        );
        Self {
            gateway,
            rate_limiter,
            encoder,
            server_name,
        }
    }

    pub fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: self.gateway.capabilities(),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Charges the call to the client's budget without running it
    pub fn check_rate_limit(&self, client: &str, category: ToolCategory) -> Result<(), McpError> {
        self.rate_limiter
            .check_and_record(client, category)
            .map_err(|retry_after_secs| McpError::RateLimited { retry_after_secs })
    }

    /// Rate-limited tool call on behalf of `client`. Calls rejected by the
    /// catalog or the operating mode do not use up the budget.
    pub async fn call_tool(
        &self,
        client: &str,
        name: &str,
        arguments: Value,
    ) -> Result<Value, McpError> {
        let call = self.gateway.admit(name, arguments)?;
        self.check_rate_limit(client, ToolCategory::of_tool(call.name()))?;
        self.gateway.execute(call).await
    }

    /// Streaming variant of [`McpState::call_tool`]. Only admitted calls are
    /// charged; rejected ones stream their error without touching the budget.
    pub fn stream_tool_call(
        &self,
        client: &str,
        name: String,
        arguments: Value,
    ) -> Result<ReceiverStream<StreamEvent>, McpError> {
        let admission = self.gateway.admit(&name, arguments);
        if admission.is_ok() {
            self.check_rate_limit(client, ToolCategory::of_tool(&name))?;
        }
        Ok(self
            .encoder
            .stream_admission(self.gateway.clone(), name, admission))
    }

    /// Rate-limited resource read; reads count against the read budget.
    pub async fn read_resource(
        &self,
        client: &str,
        uri: &str,
    ) -> Result<ResourcesReadResult, McpError> {
        self.gateway.resource_definition(uri)?;
        self.check_rate_limit(client, ToolCategory::Read)?;
        self.gateway.read_resource(uri).await
    }
}

/// Per-connection protocol state. Tool and resource methods are served
/// whether or not the client sent `initialize` first.
#[derive(Debug, Clone)]
pub struct McpSession {
    pub id: Uuid,
    pub client: String,
    pub initialized: bool,
}

impl McpSession {
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client: client.into(),
            initialized: false,
        }
    }
}

// ============================================================================
// Transports
// ============================================================================

/// WebSocket upgrade handler for MCP
pub async fn mcp_ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp_state): State<GuardedMcpState>,
) -> Response {
    let session = McpSession::new(addr.ip().to_string());
    info!("MCP WebSocket upgrade from {} (session {})", addr, session.id);

    ws.on_upgrade(move |socket| handle_mcp_socket(socket, session, mcp_state))
}

async fn handle_mcp_socket(socket: WebSocket, mut session: McpSession, mcp_state: GuardedMcpState) {
    debug!("MCP connection established for session {}", session.id);

    let (mut ws_sink, mut ws_stream) = socket.split();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let response = handle_message(&text, &mut session, &mcp_state).await;

                if let Some(response) = response {
                    match serde_json::to_string(&response) {
                        Ok(json) => {
                            if ws_sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to serialize MCP response: {}", e);
                        }
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }

    debug!("MCP connection closed for session {}", session.id);
}

/// Single JSON-RPC request over HTTP. Notifications are acknowledged with
/// 202 and no body.
pub async fn mcp_rpc_handler(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp_state): State<GuardedMcpState>,
    body: String,
) -> Response {
    let mut session = McpSession::new(addr.ip().to_string());

    match handle_message(&body, &mut session, &mcp_state).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Handle a single MCP message
pub async fn handle_message(
    text: &str,
    session: &mut McpSession,
    mcp_state: &McpState,
) -> Option<McpResponse> {
    let request: McpRequest = match serde_json::from_str(text) {
        Ok(req) => req,
        Err(e) => {
            return Some(McpResponse::error(
                None,
                McpError::ParseError(e.to_string()),
            ));
        }
    };

    let request_id = request.id.clone();

    let result = match request.method.as_str() {
        methods::INITIALIZE => handle_initialize(&request, session, mcp_state),
        methods::INITIALIZED => {
            // Notification, no response needed
            return None;
        }
        methods::PING => to_value(PingResult {}),
        methods::MODE_INFO => to_value(mcp_state.gateway.mode_info()),
        methods::TOOLS_LIST => to_value(ToolsListResult {
            tools: mcp_state.gateway.list_tools().to_vec(),
        }),
        methods::TOOLS_CALL => handle_tools_call(&request, session, mcp_state).await,
        methods::RESOURCES_LIST => to_value(ResourcesListResult {
            resources: mcp_state.gateway.list_resources().to_vec(),
        }),
        methods::RESOURCES_READ => handle_resources_read(&request, session, mcp_state).await,
        methods::SHUTDOWN => {
            session.initialized = false;
            Ok(Value::Null)
        }
        other => Err(McpError::MethodNotFound(other.to_string())),
    };

    // Requests without an id are notifications: never answered.
    request_id.as_ref()?;

    Some(match result {
        Ok(value) => McpResponse::success(request_id, value),
        Err(error) => McpResponse::error(request_id, error),
    })
}

fn to_value<T: Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

fn parse_params<T: serde::de::DeserializeOwned>(request: &McpRequest) -> Result<T, McpError> {
    request
        .params
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))
}

fn handle_initialize(
    request: &McpRequest,
    session: &mut McpSession,
    mcp_state: &McpState,
) -> Result<Value, McpError> {
    let params: InitializeParams = request
        .params
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .unwrap_or_default();

    if let Some(client) = &params.client_info {
        info!(
            "MCP client {} {} initialized session {}",
            client.name, client.version, session.id
        );
    }
    session.initialized = true;

    to_value(mcp_state.initialize_result())
}

async fn handle_tools_call(
    request: &McpRequest,
    session: &McpSession,
    mcp_state: &McpState,
) -> Result<Value, McpError> {
    let params: ToolsCallParams = parse_params(request)?;

    mcp_state
        .call_tool(
            &session.client,
            &params.name,
            params.arguments.unwrap_or(Value::Null),
        )
        .await
}

async fn handle_resources_read(
    request: &McpRequest,
    session: &McpSession,
    mcp_state: &McpState,
) -> Result<Value, McpError> {
    let params: ResourcesReadParams = parse_params(request)?;

    let result = mcp_state
        .read_resource(&session.client, &params.uri)
        .await?;
    to_value(result)
}
