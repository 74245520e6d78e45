//! Permission-gated tool gateway
//!
//! Ties the catalog, the permission manager and the handler registry together
//! in front of the shared backend client. Every invocation is checked against
//! the catalog and the operating mode before any remote call is made.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::catalog::Catalog;
use super::context::ToolContext;
use super::permissions::{ModeInfo, PermissionManager};
use super::protocol::{
    McpError, ResourceContent, ResourceDefinition, ResourcesReadResult, ServerCapabilities,
    ToolDefinition,
};
use super::registry::{McpRegistry, RegistryError};
use super::resources::register_all_resources;
use super::tools::register_all_tools;
use crate::odoo::{OdooClient, OdooError};

impl From<OdooError> for McpError {
    fn from(err: OdooError) -> Self {
        match err {
            OdooError::Authentication(msg) => McpError::Authentication(msg),
            remote @ OdooError::RemoteCall { .. } => McpError::RemoteCall(remote.to_string()),
        }
    }
}

/// A tool call that passed the catalog and permission checks
#[derive(Debug)]
pub struct AdmittedCall {
    name: String,
    arguments: Map<String, Value>,
}

impl AdmittedCall {
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct ToolGateway {
    catalog: Catalog,
    permissions: PermissionManager,
    registry: McpRegistry,
    odoo: Arc<OdooClient>,
}

impl ToolGateway {
    /// Fails when a catalog entry has no handler or a handler has no entry.
    pub fn new(
        catalog: Catalog,
        permissions: PermissionManager,
        registry: McpRegistry,
        odoo: Arc<OdooClient>,
    ) -> Result<Self, RegistryError> {
        registry.validate(&catalog)?;
        Ok(Self {
            catalog,
            permissions,
            registry,
            odoo,
        })
    }

    /// Gateway over the fixed Odoo catalog with every built-in handler
    pub fn for_odoo(
        permissions: PermissionManager,
        odoo: Arc<OdooClient>,
    ) -> Result<Self, RegistryError> {
        let mut registry = McpRegistry::new();
        register_all_tools(&mut registry);
        register_all_resources(&mut registry);
        Self::new(Catalog::odoo(), permissions, registry, odoo)
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: true,
            resources: true,
            prompts: false,
            sampling: false,
            streaming: true,
        }
    }

    /// All catalog tools, including the ones the current mode rejects
    pub fn list_tools(&self) -> &[ToolDefinition] {
        self.catalog.list_tools()
    }

    pub fn list_resources(&self) -> &[ResourceDefinition] {
        self.catalog.list_resources()
    }

    pub fn mode_info(&self) -> ModeInfo {
        self.permissions.mode_info()
    }

    pub fn permissions(&self) -> &PermissionManager {
        &self.permissions
    }

    pub fn odoo(&self) -> &Arc<OdooClient> {
        &self.odoo
    }

    pub fn is_call_permitted(&self, name: &str, arguments: &Map<String, Value>) -> bool {
        self.permissions.validate_call(name, arguments)
    }

    /// Checks a call against the catalog and the operating mode without
    /// touching the backend. Null arguments count as an empty object.
    pub fn admit(&self, name: &str, arguments: Value) -> Result<AdmittedCall, McpError> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(McpError::InvalidParams(format!(
                    "arguments must be an object, got {}",
                    other
                )))
            }
        };

        if self.catalog.get_tool(name).is_none() {
            warn!("Unknown tool requested: {}", name);
            return Err(McpError::UnknownTool(name.to_string()));
        }

        if !self.permissions.validate_call(name, &arguments) {
            return Err(McpError::PermissionDenied(format!(
                "Tool '{}' not allowed in {} mode",
                name,
                self.permissions.mode()
            )));
        }

        Ok(AdmittedCall {
            name: name.to_string(),
            arguments,
        })
    }

    pub async fn execute(&self, call: AdmittedCall) -> Result<Value, McpError> {
        let AdmittedCall { name, arguments } = call;
        let handler = self
            .registry
            .tool(&name)
            .ok_or_else(|| McpError::InternalError(format!("no handler for {}", name)))?;

        debug!("Calling tool {}", name);
        let result = handler(self.context(), arguments).await;
        if let Err(e) = &result {
            error!("Tool execution error for {}: {}", name, e);
        }
        result
    }

    pub fn resource_definition(&self, uri: &str) -> Result<&ResourceDefinition, McpError> {
        self.catalog
            .get_resource(uri)
            .ok_or_else(|| McpError::UnknownResource(uri.to_string()))
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ResourcesReadResult, McpError> {
        let definition = self.resource_definition(uri)?;

        let handler = self
            .registry
            .resource(uri)
            .ok_or_else(|| McpError::InternalError(format!("no handler for {}", uri)))?;

        let payload = handler(self.context()).await.map_err(|e| {
            error!("Resource read error for {}: {}", uri, e);
            e
        })?;

        let text = serde_json::to_string(&payload)
            .map_err(|e| McpError::InternalError(e.to_string()))?;

        Ok(ResourcesReadResult {
            contents: vec![ResourceContent {
                uri: uri.to_string(),
                mime_type: definition.mime_type.clone(),
                text,
            }],
        })
    }

    fn context(&self) -> ToolContext {
        ToolContext::new(self.odoo.clone())
    }
}
