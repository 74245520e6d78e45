//! MCP Tool and Resource Registry
//!
//! Maps catalog entries to the async handlers that execute them.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::catalog::Catalog;
use super::context::ToolContext;
use super::protocol::McpError;

// ============================================================================
// Handler Types
// ============================================================================

/// Result type for tool execution
pub type ToolResult = Result<Value, McpError>;

/// Boxed future for async tool execution
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Tool handler function type
pub type ToolHandler = Arc<dyn Fn(ToolContext, Map<String, Value>) -> ToolFuture + Send + Sync>;

/// Result type for resource reads: the payload serialized into the content text
pub type ResourceResult = Result<Value, McpError>;

/// Boxed future for async resource read
pub type ResourceFuture = Pin<Box<dyn Future<Output = ResourceResult> + Send>>;

/// Resource handler function type
pub type ResourceHandler = Arc<dyn Fn(ToolContext) -> ResourceFuture + Send + Sync>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No handler registered for tool {0}")]
    MissingToolHandler(String),

    #[error("No handler registered for resource {0}")]
    MissingResourceHandler(String),

    #[error("Handler registered for {0}, which is not in the catalog")]
    UnknownEntry(String),
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Default)]
pub struct McpRegistry {
    tools: HashMap<String, ToolHandler>,
    resources: HashMap<String, ResourceHandler>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler, replacing any previous one with the same name
    pub fn register_tool<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(ToolContext, Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        self.tools.insert(
            name.into(),
            Arc::new(move |ctx, args| Box::pin(handler(ctx, args))),
        );
    }

    /// Register a resource handler
    pub fn register_resource<F, Fut>(&mut self, uri: impl Into<String>, handler: F)
    where
        F: Fn(ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResourceResult> + Send + 'static,
    {
        self.resources
            .insert(uri.into(), Arc::new(move |ctx| Box::pin(handler(ctx))));
    }

    pub fn tool(&self, name: &str) -> Option<ToolHandler> {
        self.tools.get(name).cloned()
    }

    pub fn resource(&self, uri: &str) -> Option<ResourceHandler> {
        self.resources.get(uri).cloned()
    }

    /// Every catalog entry must have a handler and every handler a catalog entry.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), RegistryError> {
        for name in catalog.tool_names() {
            if !self.tools.contains_key(name) {
                return Err(RegistryError::MissingToolHandler(name.to_string()));
            }
        }
        for uri in catalog.resource_uris() {
            if !self.resources.contains_key(uri) {
                return Err(RegistryError::MissingResourceHandler(uri.to_string()));
            }
        }

        if let Some(name) = self.tools.keys().find(|n| catalog.get_tool(n).is_none()) {
            return Err(RegistryError::UnknownEntry(name.clone()));
        }
        if let Some(uri) = self
            .resources
            .keys()
            .find(|u| catalog.get_resource(u).is_none())
        {
            return Err(RegistryError::UnknownEntry(uri.clone()));
        }

        Ok(())
    }

    /// Get the number of registered tools
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Get the number of registered resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}
