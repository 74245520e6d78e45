//! In-memory Odoo backend
//!
//! Answers the handful of JSON-RPC calls the gateway makes with fixed data
//! and records every `model.method` it receives so tests can assert on what
//! reached the backend.

use super::constants::*;
use odoo_mcp_gateway::odoo::{RpcConnector, RpcError, RpcTransport};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeOdoo {
    calls: Mutex<Vec<String>>,
    logins: AtomicUsize,
    reject_login: bool,
}

impl FakeOdoo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose `common.authenticate` always returns `false`
    pub fn rejecting_login() -> Arc<Self> {
        Arc::new(Self {
            reject_login: true,
            ..Self::default()
        })
    }

    /// Every `model.method` pair executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `common.authenticate` calls received
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn executed_count(&self, model_method: &str) -> usize {
        self.executed().iter().filter(|c| *c == model_method).count()
    }

    fn partners() -> Vec<Value> {
        (1..=PARTNER_COUNT)
            .map(|id| json!({"id": id, "name": format!("Partner {}", id)}))
            .collect()
    }

    fn execute(&self, model: &str, method: &str, args: &[Value]) -> Result<Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}.{}", model, method));

        let kwargs = args.get(1).cloned().unwrap_or_else(|| json!({}));
        match (model, method) {
            ("res.partner", "search_read") => {
                let mut partners = Self::partners();
                if let Some(limit) = kwargs.get("limit").and_then(Value::as_u64) {
                    partners.truncate(limit as usize);
                }
                Ok(Value::Array(partners))
            }
            ("res.partner", "search_count") => Ok(json!(PARTNER_COUNT)),
            ("res.partner", "create") => Ok(json!(CREATED_ID)),
            ("res.partner", "write") | ("res.partner", "unlink") => Ok(json!(true)),
            ("res.partner", "fields_get") => Ok(json!({
                "name": {"type": "char", "string": "Name"},
                "email": {"type": "char", "string": "Email"},
            })),
            ("ir.model", "search_read") => Ok(Value::Array(
                MODEL_NAMES
                    .iter()
                    .map(|m| json!({"model": m, "name": m, "info": false}))
                    .collect(),
            )),
            ("res.users", "search_read") => Ok(json!([{"id": 2, "name": "Mitchell Admin"}])),
            ("res.company", "search_read") => Ok(json!([{"id": 1, "name": "My Company"}])),
            (_, "search_read") => Ok(json!([])),
            _ => Err(RpcError::Fault {
                code: 200,
                message: format!("Method {} does not exist on {}", method, model),
            }),
        }
    }
}

/// Connector handing out transports backed by one shared [`FakeOdoo`]
pub struct FakeOdooConnector(pub Arc<FakeOdoo>);

struct FakeOdooTransport(Arc<FakeOdoo>);

impl RpcConnector for FakeOdooConnector {
    fn open(&self) -> Result<Arc<dyn RpcTransport>, RpcError> {
        Ok(Arc::new(FakeOdooTransport(self.0.clone())))
    }
}

impl RpcTransport for FakeOdooTransport {
    fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        match (service, method) {
            ("common", "version") => Ok(json!({"server_version": SERVER_VERSION})),
            ("common", "authenticate") => {
                self.0.logins.fetch_add(1, Ordering::SeqCst);
                if self.0.reject_login {
                    Ok(json!(false))
                } else {
                    Ok(json!(TEST_UID))
                }
            }
            ("object", "execute_kw") => {
                let model = args.get(3).and_then(Value::as_str).unwrap_or_default();
                let method = args.get(4).and_then(Value::as_str).unwrap_or_default();
                self.0.execute(model, method, args.get(5..).unwrap_or_default())
            }
            _ => Err(RpcError::InvalidResponse(format!(
                "unexpected call {}.{}",
                service, method
            ))),
        }
    }
}
