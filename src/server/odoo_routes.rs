//! Direct Odoo access routes. `/odoo/query` passes the same permission gate
//! as the generic method-call tool.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

use super::mcp_routes::json_body;
use super::state::{GuardedMcpState, ServerState};
use crate::mcp::catalog::ODOO_CALL;
use crate::mcp::protocol::McpError;
use crate::mcp::rate_limit::ToolCategory;

#[derive(Debug, Deserialize)]
struct QueryBody {
    model: String,
    method: String,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
}

async fn post_query(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp): State<GuardedMcpState>,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> Result<Json<Value>, McpError> {
    let body = json_body(body)?;

    let mut gate_args = Map::new();
    gate_args.insert("method".to_string(), Value::String(body.method.clone()));
    if !mcp.gateway.is_call_permitted(ODOO_CALL, &gate_args) {
        warn!(
            "Rejected query {}.{} in {} mode",
            body.model,
            body.method,
            mcp.gateway.permissions().mode()
        );
        return Err(McpError::PermissionDenied(format!(
            "Method '{}' not allowed in {} mode",
            body.method,
            mcp.gateway.permissions().mode()
        )));
    }
    mcp.check_rate_limit(&addr.ip().to_string(), ToolCategory::of_tool(ODOO_CALL))?;

    let result = mcp
        .gateway
        .odoo()
        .invoke(&body.model, &body.method, body.args, body.kwargs)
        .await?;
    Ok(Json(json!({ "result": result })))
}

async fn get_models(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp): State<GuardedMcpState>,
) -> Result<Json<Value>, McpError> {
    mcp.check_rate_limit(&addr.ip().to_string(), ToolCategory::Read)?;
    let models = mcp.gateway.odoo().list_models().await?;
    Ok(Json(json!({ "models": models })))
}

async fn get_model_fields(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(mcp): State<GuardedMcpState>,
    Path(model): Path<String>,
) -> Result<Json<Value>, McpError> {
    mcp.check_rate_limit(&addr.ip().to_string(), ToolCategory::Read)?;
    let fields = mcp.gateway.odoo().fields_get(&model, &[]).await?;
    Ok(Json(json!({ "fields": fields })))
}

pub fn make_odoo_routes(state: ServerState) -> Router {
    Router::new()
        .route("/odoo/query", post(post_query))
        .route("/odoo/models", get(get_models))
        .route("/odoo/models/{model}/fields", get(get_model_fields))
        .with_state(state)
}
