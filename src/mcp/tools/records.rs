//! Record Tools
//!
//! Search, create, update and delete records, and describe model fields.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::parse_arguments;
use crate::mcp::catalog::{ODOO_CREATE, ODOO_FIELDS_GET, ODOO_SEARCH, ODOO_UNLINK, ODOO_WRITE};
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{McpRegistry, ToolResult};

/// Register record tools with the registry
pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(ODOO_SEARCH, search_handler);
    registry.register_tool(ODOO_CREATE, create_handler);
    registry.register_tool(ODOO_WRITE, write_handler);
    registry.register_tool(ODOO_UNLINK, unlink_handler);
    registry.register_tool(ODOO_FIELDS_GET, fields_get_handler);
}

// ============================================================================
// odoo_search
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchParams {
    model: String,
    #[serde(default = "empty_domain")]
    domain: Value,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default = "default_limit")]
    limit: u64,
}

fn empty_domain() -> Value {
    json!([])
}

fn default_limit() -> u64 {
    100
}

async fn search_handler(ctx: ToolContext, args: Map<String, Value>) -> ToolResult {
    let params: SearchParams = parse_arguments(args, &["model"])?;

    let mut kwargs = Map::new();
    kwargs.insert("fields".to_string(), json!(params.fields));
    kwargs.insert("limit".to_string(), json!(params.limit));

    let records = ctx
        .odoo
        .invoke(&params.model, "search_read", vec![params.domain], kwargs)
        .await?;
    let count = records.as_array().map(Vec::len).unwrap_or_default();

    Ok(json!({
        "model": params.model,
        "count": count,
        "records": records,
    }))
}

// ============================================================================
// odoo_create
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateParams {
    model: String,
    values: Value,
}

async fn create_handler(ctx: ToolContext, args: Map<String, Value>) -> ToolResult {
    let params: CreateParams = parse_arguments(args, &["model", "values"])?;

    let created_id = ctx.odoo.create(&params.model, params.values).await?;

    Ok(json!({
        "model": params.model,
        "created_id": created_id,
        "success": true,
    }))
}

// ============================================================================
// odoo_write / odoo_unlink
// ============================================================================

#[derive(Debug, Deserialize)]
struct WriteParams {
    model: String,
    ids: Vec<i64>,
    values: Value,
}

async fn write_handler(ctx: ToolContext, args: Map<String, Value>) -> ToolResult {
    let params: WriteParams = parse_arguments(args, &["model", "ids", "values"])?;

    let success = ctx
        .odoo
        .write(&params.model, &params.ids, params.values)
        .await?;

    Ok(json!({
        "model": params.model,
        "updated_ids": params.ids,
        "success": success,
    }))
}

#[derive(Debug, Deserialize)]
struct UnlinkParams {
    model: String,
    ids: Vec<i64>,
}

async fn unlink_handler(ctx: ToolContext, args: Map<String, Value>) -> ToolResult {
    let params: UnlinkParams = parse_arguments(args, &["model", "ids"])?;

    let success = ctx.odoo.unlink(&params.model, &params.ids).await?;

    Ok(json!({
        "model": params.model,
        "deleted_ids": params.ids,
        "success": success,
    }))
}

// ============================================================================
// odoo_fields_get
// ============================================================================

#[derive(Debug, Deserialize)]
struct FieldsGetParams {
    model: String,
    #[serde(default)]
    fields: Vec<String>,
}

async fn fields_get_handler(ctx: ToolContext, args: Map<String, Value>) -> ToolResult {
    let params: FieldsGetParams = parse_arguments(args, &["model"])?;

    let fields = ctx.odoo.fields_get(&params.model, &params.fields).await?;

    Ok(json!({
        "model": params.model,
        "fields": fields,
    }))
}
