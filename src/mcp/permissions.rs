//! Operating mode and the permission checks derived from it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::catalog::{required_permissions, ODOO_CALL, TOOL_NAMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
    Delete,
    Execute,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::Read,
        PermissionLevel::Write,
        PermissionLevel::Delete,
        PermissionLevel::Execute,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    ReadOnly,
    ReadWrite,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::ReadOnly => "readonly",
            OperatingMode::ReadWrite => "readwrite",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OperatingMode::ReadOnly => {
                "Read-only mode - only read and lookup operations are allowed"
            }
            OperatingMode::ReadWrite => "Read/write mode - all operations are allowed",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid mode '{0}', expected 'readonly' or 'readwrite'")]
pub struct InvalidMode(pub String);

impl FromStr for OperatingMode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "readonly" => Ok(OperatingMode::ReadOnly),
            "readwrite" => Ok(OperatingMode::ReadWrite),
            _ => Err(InvalidMode(s.to_string())),
        }
    }
}

/// Backend methods treated as mutations when reached through `odoo_call` in
/// read-only mode. Matched as substrings of the lowercased method name, so
/// e.g. `get_post_address` is rejected too.
const WRITE_METHOD_MARKERS: [&str; 12] = [
    "create",
    "write",
    "unlink",
    "copy",
    "toggle_active",
    "action_confirm",
    "action_cancel",
    "action_done",
    "button_confirm",
    "button_cancel",
    "post",
    "reconcile",
];

/// Snapshot of the active mode, as reported to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModeInfo {
    pub mode: OperatingMode,
    pub allowed_permissions: Vec<PermissionLevel>,
    pub forbidden_permissions: Vec<PermissionLevel>,
    pub allowed_tools: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct PermissionManager {
    mode: OperatingMode,
    allowed: BTreeSet<PermissionLevel>,
    forbidden: BTreeSet<PermissionLevel>,
}

impl PermissionManager {
    pub fn new(mode: &str) -> Result<Self, InvalidMode> {
        Ok(Self::from_mode(mode.parse()?))
    }

    pub fn from_mode(mode: OperatingMode) -> Self {
        let forbidden: BTreeSet<PermissionLevel> = match mode {
            OperatingMode::ReadOnly => [PermissionLevel::Write, PermissionLevel::Delete].into(),
            OperatingMode::ReadWrite => BTreeSet::new(),
        };
        let allowed = PermissionLevel::ALL
            .into_iter()
            .filter(|p| !forbidden.contains(p))
            .collect();

        info!("Permissions configured for mode {}", mode);
        Self {
            mode,
            allowed,
            forbidden,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn allowed_permissions(&self) -> &BTreeSet<PermissionLevel> {
        &self.allowed
    }

    pub fn forbidden_permissions(&self) -> &BTreeSet<PermissionLevel> {
        &self.forbidden
    }

    pub fn is_tool_allowed(&self, tool_name: &str) -> bool {
        !required_permissions(tool_name)
            .iter()
            .any(|p| self.forbidden.contains(p))
    }

    /// Checks a tool invocation against the mode, including the method-name
    /// filter applied to `odoo_call`.
    pub fn validate_call(&self, tool_name: &str, arguments: &Map<String, Value>) -> bool {
        if !self.is_tool_allowed(tool_name) {
            warn!("Tool {} not allowed in {} mode", tool_name, self.mode);
            return false;
        }

        if tool_name == ODOO_CALL {
            return self.validate_odoo_call(arguments);
        }

        true
    }

    fn validate_odoo_call(&self, arguments: &Map<String, Value>) -> bool {
        if self.mode != OperatingMode::ReadOnly {
            return true;
        }

        let method = arguments
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();

        if WRITE_METHOD_MARKERS.iter().any(|m| method.contains(m)) {
            warn!("Method {} is forbidden in readonly mode", method);
            return false;
        }

        true
    }

    /// Catalog tools usable in the current mode, in catalog order
    pub fn allowed_tools(&self) -> Vec<String> {
        TOOL_NAMES
            .iter()
            .filter(|name| self.is_tool_allowed(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn mode_info(&self) -> ModeInfo {
        ModeInfo {
            mode: self.mode,
            allowed_permissions: self.allowed.iter().copied().collect(),
            forbidden_permissions: self.forbidden.iter().copied().collect(),
            allowed_tools: self.allowed_tools(),
            description: self.mode.description().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_mode_parsing_is_case_insensitive() {
        assert_eq!("READONLY".parse::<OperatingMode>(), Ok(OperatingMode::ReadOnly));
        assert_eq!("ReadWrite".parse::<OperatingMode>(), Ok(OperatingMode::ReadWrite));
        assert_eq!(
            "admin".parse::<OperatingMode>(),
            Err(InvalidMode("admin".to_string()))
        );
        assert!(PermissionManager::new("").is_err());
    }

    #[test]
    fn test_permission_sets_partition_levels() {
        for mode in [OperatingMode::ReadOnly, OperatingMode::ReadWrite] {
            let pm = PermissionManager::from_mode(mode);
            assert!(pm.allowed_permissions().is_disjoint(pm.forbidden_permissions()));
            let union: BTreeSet<_> = pm
                .allowed_permissions()
                .union(pm.forbidden_permissions())
                .copied()
                .collect();
            assert_eq!(union, BTreeSet::from(PermissionLevel::ALL));
        }
    }

    #[test]
    fn test_readonly_sets() {
        let pm = PermissionManager::new("readonly").unwrap();
        assert_eq!(
            pm.allowed_permissions(),
            &BTreeSet::from([PermissionLevel::Read, PermissionLevel::Execute])
        );
        assert_eq!(
            pm.forbidden_permissions(),
            &BTreeSet::from([PermissionLevel::Write, PermissionLevel::Delete])
        );
    }

    #[test]
    fn test_readonly_allowed_tools() {
        let pm = PermissionManager::new("readonly").unwrap();
        assert_eq!(
            pm.allowed_tools(),
            vec!["odoo_search", "odoo_call", "odoo_fields_get", "odoo_report"]
        );
        assert!(!pm.is_tool_allowed("odoo_create"));
        assert!(!pm.is_tool_allowed("odoo_write"));
        assert!(!pm.is_tool_allowed("odoo_unlink"));
    }

    #[test]
    fn test_readwrite_allows_everything() {
        let pm = PermissionManager::new("readwrite").unwrap();
        assert_eq!(pm.allowed_tools().len(), 7);
        assert!(pm.forbidden_permissions().is_empty());
        assert!(pm.validate_call(
            "odoo_call",
            &args(json!({"model": "sale.order", "method": "action_confirm"}))
        ));
    }

    #[test]
    fn test_unknown_tool_defaults_to_read() {
        let ro = PermissionManager::new("readonly").unwrap();
        assert!(ro.is_tool_allowed("does_not_exist"));
        assert!(ro.is_tool_allowed("odoo_call_readonly"));
    }

    #[test]
    fn test_readonly_odoo_call_filter() {
        let pm = PermissionManager::new("readonly").unwrap();

        assert!(!pm.validate_call(
            "odoo_call",
            &args(json!({"model": "res.partner", "method": "write"}))
        ));
        assert!(!pm.validate_call(
            "odoo_call",
            &args(json!({"model": "sale.order", "method": "Action_Confirm"}))
        ));
        assert!(pm.validate_call(
            "odoo_call",
            &args(json!({"model": "res.partner", "method": "name_search"}))
        ));
        assert!(pm.validate_call("odoo_call", &args(json!({"model": "res.partner"}))));
    }

    #[test]
    fn test_readonly_filter_matches_substrings() {
        let pm = PermissionManager::new("readonly").unwrap();
        // "post" is a marker, so read-only helpers containing it are rejected.
        assert!(!pm.validate_call(
            "odoo_call",
            &args(json!({"model": "res.partner", "method": "get_post_address"}))
        ));
    }

    #[test]
    fn test_validate_call_rejects_forbidden_tool() {
        let pm = PermissionManager::new("readonly").unwrap();
        assert!(!pm.validate_call(
            "odoo_create",
            &args(json!({"model": "res.partner", "values": {}}))
        ));
        assert!(pm.validate_call("odoo_search", &args(json!({"model": "res.partner"}))));
    }

    #[test]
    fn test_mode_info() {
        let info = PermissionManager::new("readonly").unwrap().mode_info();
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({
                "mode": "readonly",
                "allowed_permissions": ["read", "execute"],
                "forbidden_permissions": ["write", "delete"],
                "allowed_tools": ["odoo_search", "odoo_call", "odoo_fields_get", "odoo_report"],
                "description": "Read-only mode - only read and lookup operations are allowed"
            })
        );

        let info = PermissionManager::new("readwrite").unwrap().mode_info();
        assert_eq!(info.description, "Read/write mode - all operations are allowed");
        assert!(info.forbidden_permissions.is_empty());
    }
}
