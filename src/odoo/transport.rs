//! Blocking RPC transport to the Odoo backend.
//!
//! Odoo exposes its `common` and `object` services both over XML-RPC and over
//! a JSON-RPC endpoint at `/jsonrpc`. We speak the JSON-RPC flavour, which
//! carries the exact same service/method/argument triples.
//!
//! Everything in this module blocks the calling thread. Callers on the async
//! side must go through `tokio::task::spawn_blocking`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors that can occur while talking to the backend
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a fault payload
    #[error("{message}")]
    Fault { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The blocking worker running the call died
    #[error("Worker failed: {0}")]
    Worker(String),
}

/// A synchronous connection able to run `service.method(args)` on the backend.
pub trait RpcTransport: Send + Sync {
    fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value, RpcError>;
}

/// Opens transports. Called lazily, from a blocking context, the first time a
/// session needs one and again after the session was closed.
pub trait RpcConnector: Send + Sync {
    fn open(&self) -> Result<Arc<dyn RpcTransport>, RpcError>;
}

/// Builds the JSON-RPC endpoint for a backend base URL.
pub fn jsonrpc_endpoint(base_url: &str) -> String {
    format!("{}/jsonrpc", base_url.trim_end_matches('/'))
}

// ============================================================================
// JSON-RPC implementation
// ============================================================================

/// Connector producing [`JsonRpcTransport`]s backed by `reqwest::blocking`.
pub struct JsonRpcConnector {
    endpoint: String,
    timeout: Duration,
}

impl JsonRpcConnector {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            endpoint: jsonrpc_endpoint(base_url),
            timeout,
        }
    }
}

impl RpcConnector for JsonRpcConnector {
    fn open(&self) -> Result<Arc<dyn RpcTransport>, RpcError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        Ok(Arc::new(JsonRpcTransport {
            client,
            endpoint: self.endpoint.clone(),
            next_id: AtomicU64::new(1),
        }))
    }
}

pub struct JsonRpcTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcTransport for JsonRpcTransport {
    fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": {
                "service": service,
                "method": method,
                "args": args,
            },
            "id": id,
        });

        let response = self.client.post(&self.endpoint).json(&body).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::InvalidResponse(format!(
                "{}.{} returned HTTP status {}",
                service, method, status
            )));
        }

        let envelope: ResponseEnvelope = response.json()?;
        envelope.into_result()
    }
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<FaultPayload>,
}

#[derive(Debug, Deserialize)]
struct FaultPayload {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<FaultData>,
}

/// Odoo puts the useful part of the fault (the Python exception message) here,
/// while `message` is usually just "Odoo Server Error".
#[derive(Debug, Deserialize)]
struct FaultData {
    #[serde(default)]
    message: String,
}

impl ResponseEnvelope {
    fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(fault) => {
                let detail = fault
                    .data
                    .map(|d| d.message)
                    .filter(|m| !m.is_empty());
                Err(RpcError::Fault {
                    code: fault.code,
                    message: detail.unwrap_or(fault.message),
                })
            }
            None => Ok(self.result),
        }
    }
}
