//! MCP Tool Execution Context
//!
//! Provides access to the backend for tool and resource handlers.

use std::sync::Arc;

use crate::odoo::OdooClient;

/// Context provided to tool and resource handlers during execution
#[derive(Clone)]
pub struct ToolContext {
    /// Shared backend session
    pub odoo: Arc<OdooClient>,
}

impl ToolContext {
    pub fn new(odoo: Arc<OdooClient>) -> Self {
        Self { odoo }
    }
}
