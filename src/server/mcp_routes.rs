//! REST and SSE routes over the tool gateway

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::state::{GuardedGateway, GuardedMcpState, ServerState};
use crate::mcp::handler::{mcp_rpc_handler, mcp_ws_handler};
use crate::mcp::protocol::{
    McpError, McpErrorResponse, ResourcesListResult, ResourcesReadParams, ResourcesReadResult,
    ToolsListResult,
};

impl IntoResponse for McpError {
    fn into_response(self) -> Response {
        let status = match &self {
            McpError::ParseError(_)
            | McpError::InvalidRequest(_)
            | McpError::InvalidParams(_)
            | McpError::MissingArgument(_) => StatusCode::BAD_REQUEST,
            McpError::MethodNotFound(_) | McpError::UnknownTool(_) | McpError::UnknownResource(_) => {
                StatusCode::NOT_FOUND
            }
            McpError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            McpError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            McpError::Authentication(_) | McpError::RemoteCall(_) => StatusCode::BAD_GATEWAY,
            McpError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body: McpErrorResponse = self.into();
        (status, Json(json!({ "error": body }))).into_response()
    }
}

/// Body extraction failures reported in the same shape as every other error
pub(super) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, McpError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| McpError::InvalidParams(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub(super) struct ToolCallBody {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn health(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": state.mcp_state.server_name,
    }))
}

async fn get_mode(State(gateway): State<GuardedGateway>) -> Response {
    Json(gateway.mode_info()).into_response()
}

async fn post_initialize(State(mcp): State<GuardedMcpState>) -> Response {
    Json(mcp.initialize_result()).into_response()
}

async fn post_tools_list(State(gateway): State<GuardedGateway>) -> Response {
    Json(ToolsListResult {
        tools: gateway.list_tools().to_vec(),
    })
    .into_response()
}

async fn post_tools_call(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp): State<GuardedMcpState>,
    body: Result<Json<ToolCallBody>, JsonRejection>,
) -> Result<Json<Value>, McpError> {
    let body = json_body(body)?;
    let client = addr.ip().to_string();

    mcp.call_tool(&client, &body.name, body.arguments)
        .await
        .map(Json)
}

async fn post_resources_list(State(gateway): State<GuardedGateway>) -> Response {
    Json(ResourcesListResult {
        resources: gateway.list_resources().to_vec(),
    })
    .into_response()
}

async fn post_resources_read(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp): State<GuardedMcpState>,
    body: Result<Json<ResourcesReadParams>, JsonRejection>,
) -> Result<Json<ResourcesReadResult>, McpError> {
    let body = json_body(body)?;
    let client = addr.ip().to_string();

    mcp.read_resource(&client, &body.uri).await.map(Json)
}

/// Streams the call as server-sent events, one JSON event per `data:` line.
/// Rate limiting and body errors are reported before the stream starts;
/// everything after that arrives as an `error` event.
async fn post_stream_tools_call(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp): State<GuardedMcpState>,
    body: Result<Json<ToolCallBody>, JsonRejection>,
) -> Result<Response, McpError> {
    let body = json_body(body)?;
    let client = addr.ip().to_string();

    let events = mcp
        .stream_tool_call(&client, body.name, body.arguments)?
        .map(|event| {
            let sse = Event::default().json_data(&event).unwrap_or_else(|e| {
                error!("Failed to encode stream event: {}", e);
                Event::default().data(r#"{"type":"error","message":"encoding failed"}"#)
            });
            Ok::<_, Infallible>(sse)
        });

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::new())
        .into_response())
}

pub fn make_mcp_routes(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mcp", post(mcp_rpc_handler))
        .route("/mcp/ws", get(mcp_ws_handler))
        .route("/mcp/mode", get(get_mode))
        .route("/mcp/initialize", post(post_initialize))
        .route("/mcp/tools/list", post(post_tools_list))
        .route("/mcp/tools/call", post(post_tools_call))
        .route("/mcp/resources/list", post(post_resources_list))
        .route("/mcp/resources/read", post(post_resources_read))
        .route("/mcp/stream/tools/call", post(post_stream_tools_call))
        .with_state(state)
}
