//! Static catalog of the tools and resources the gateway offers.

use serde_json::{json, Value};

use super::permissions::PermissionLevel;
use super::protocol::{ResourceDefinition, ToolDefinition};

pub const ODOO_SEARCH: &str = "odoo_search";
pub const ODOO_CREATE: &str = "odoo_create";
pub const ODOO_WRITE: &str = "odoo_write";
pub const ODOO_UNLINK: &str = "odoo_unlink";
pub const ODOO_CALL: &str = "odoo_call";
pub const ODOO_FIELDS_GET: &str = "odoo_fields_get";
pub const ODOO_REPORT: &str = "odoo_report";

/// Permission-map only entry, never offered as a tool
pub const ODOO_CALL_READONLY: &str = "odoo_call_readonly";

pub const MODELS_URI: &str = "odoo://models";
pub const USERS_URI: &str = "odoo://users";
pub const COMPANIES_URI: &str = "odoo://companies";
pub const CONFIG_URI: &str = "odoo://config";

/// Tool names in catalog order
pub const TOOL_NAMES: [&str; 7] = [
    ODOO_SEARCH,
    ODOO_CREATE,
    ODOO_WRITE,
    ODOO_UNLINK,
    ODOO_CALL,
    ODOO_FIELDS_GET,
    ODOO_REPORT,
];

/// Permission levels a tool needs. Names outside the map need read.
pub fn required_permissions(tool_name: &str) -> &'static [PermissionLevel] {
    use PermissionLevel::*;

    match tool_name {
        ODOO_SEARCH | ODOO_FIELDS_GET => &[Read],
        ODOO_CALL_READONLY | ODOO_CALL | ODOO_REPORT => &[Read, Execute],
        ODOO_CREATE | ODOO_WRITE => &[Write],
        ODOO_UNLINK => &[Delete],
        _ => &[Read],
    }
}

/// Immutable table of tool and resource definitions, built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    tools: Vec<ToolDefinition>,
    resources: Vec<ResourceDefinition>,
}

impl Catalog {
    pub fn new(tools: Vec<ToolDefinition>, resources: Vec<ResourceDefinition>) -> Self {
        Self { tools, resources }
    }

    /// The fixed Odoo catalog
    pub fn odoo() -> Self {
        Self::new(odoo_tools(), odoo_resources())
    }

    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn list_resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn get_resource(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn resource_uris(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.uri.as_str())
    }
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn odoo_tools() -> Vec<ToolDefinition> {
    vec![
        tool(
            ODOO_SEARCH,
            "Search for records in Odoo models",
            json!({
                "type": "object",
                "properties": {
                    "model": {"type": "string", "description": "Odoo model name (e.g., 'res.partner')"},
                    "domain": {"type": "array", "description": "Search domain filters"},
                    "fields": {"type": "array", "description": "Fields to retrieve"},
                    "limit": {"type": "integer", "description": "Maximum number of records"}
                },
                "required": ["model"]
            }),
        ),
        tool(
            ODOO_CREATE,
            "Create a new record in Odoo",
            json!({
                "type": "object",
                "properties": {
                    "model": {"type": "string", "description": "Odoo model name"},
                    "values": {"type": "object", "description": "Field values for the new record"}
                },
                "required": ["model", "values"]
            }),
        ),
        tool(
            ODOO_WRITE,
            "Update existing records in Odoo",
            json!({
                "type": "object",
                "properties": {
                    "model": {"type": "string", "description": "Odoo model name"},
                    "ids": {"type": "array", "description": "Record IDs to update"},
                    "values": {"type": "object", "description": "Field values to update"}
                },
                "required": ["model", "ids", "values"]
            }),
        ),
        tool(
            ODOO_UNLINK,
            "Delete records from Odoo",
            json!({
                "type": "object",
                "properties": {
                    "model": {"type": "string", "description": "Odoo model name"},
                    "ids": {"type": "array", "description": "Record IDs to delete"}
                },
                "required": ["model", "ids"]
            }),
        ),
        tool(
            ODOO_CALL,
            "Call a method on Odoo model",
            json!({
                "type": "object",
                "properties": {
                    "model": {"type": "string", "description": "Odoo model name"},
                    "method": {"type": "string", "description": "Method name to call"},
                    "args": {"type": "array", "description": "Method arguments"},
                    "kwargs": {"type": "object", "description": "Method keyword arguments"}
                },
                "required": ["model", "method"]
            }),
        ),
        tool(
            ODOO_FIELDS_GET,
            "Get field definitions for an Odoo model",
            json!({
                "type": "object",
                "properties": {
                    "model": {"type": "string", "description": "Odoo model name"},
                    "fields": {"type": "array", "description": "Specific fields to get (optional)"}
                },
                "required": ["model"]
            }),
        ),
        tool(
            ODOO_REPORT,
            "Generate reports from Odoo",
            json!({
                "type": "object",
                "properties": {
                    "report_name": {"type": "string", "description": "Report template name"},
                    "record_ids": {"type": "array", "description": "Record IDs for the report"},
                    "format": {"type": "string", "description": "Output format (pdf, html, etc.)"}
                },
                "required": ["report_name", "record_ids"]
            }),
        ),
    ]
}

fn resource(uri: &str, name: &str, description: &str) -> ResourceDefinition {
    ResourceDefinition {
        uri: uri.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        mime_type: "application/json".to_string(),
    }
}

fn odoo_resources() -> Vec<ResourceDefinition> {
    vec![
        resource(MODELS_URI, "Odoo Models", "List of all available Odoo models"),
        resource(USERS_URI, "Odoo Users", "List of Odoo users"),
        resource(COMPANIES_URI, "Odoo Companies", "List of companies in Odoo"),
        resource(
            CONFIG_URI,
            "Odoo Configuration",
            "Odoo server configuration and settings",
        ),
    ]
}
