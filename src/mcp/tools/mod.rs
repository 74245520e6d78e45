//! MCP Tools
//!
//! Handlers for the Odoo tool catalog.

pub mod methods;
pub mod records;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::protocol::McpError;
use super::registry::McpRegistry;

/// Register all tools with the registry
pub fn register_all_tools(registry: &mut McpRegistry) {
    records::register_tools(registry);
    methods::register_tools(registry);
}

/// Decodes tool arguments after checking that every required key is present.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    args: Map<String, Value>,
    required: &[&str],
) -> Result<T, McpError> {
    if let Some(missing) = required.iter().find(|key| !args.contains_key(**key)) {
        return Err(McpError::MissingArgument(missing.to_string()));
    }

    serde_json::from_value(Value::Object(args)).map_err(|e| McpError::InvalidParams(e.to_string()))
}
