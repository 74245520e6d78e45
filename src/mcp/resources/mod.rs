//! MCP Resources
//!
//! Read-only views of the backend exposed as `odoo://` resources.

pub mod odoo;

use super::registry::McpRegistry;

/// Register all resources with the registry
pub fn register_all_resources(registry: &mut McpRegistry) {
    odoo::register_resources(registry);
}
