//! Odoo Resources
//!
//! Models, users, companies and server configuration.

use serde_json::{json, Map, Value};

use crate::mcp::catalog::{COMPANIES_URI, CONFIG_URI, MODELS_URI, USERS_URI};
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{McpRegistry, ResourceResult};

/// Register Odoo resources with the registry
pub fn register_resources(registry: &mut McpRegistry) {
    registry.register_resource(MODELS_URI, models_handler);
    registry.register_resource(USERS_URI, users_handler);
    registry.register_resource(COMPANIES_URI, companies_handler);
    registry.register_resource(CONFIG_URI, config_handler);
}

async fn models_handler(ctx: ToolContext) -> ResourceResult {
    Ok(ctx.odoo.list_models().await?)
}

async fn users_handler(ctx: ToolContext) -> ResourceResult {
    read_all(&ctx, "res.users", &["name", "login", "email"]).await
}

async fn companies_handler(ctx: ToolContext) -> ResourceResult {
    read_all(&ctx, "res.company", &["name", "email", "website"]).await
}

async fn config_handler(ctx: ToolContext) -> ResourceResult {
    Ok(ctx.odoo.get_server_info().await?)
}

/// Unfiltered `search_read` over a model
async fn read_all(ctx: &ToolContext, model: &str, fields: &[&str]) -> ResourceResult {
    let mut kwargs = Map::new();
    kwargs.insert("fields".to_string(), json!(fields));

    Ok(ctx
        .odoo
        .invoke(model, "search_read", vec![Value::Array(Vec::new())], kwargs)
        .await?)
}
