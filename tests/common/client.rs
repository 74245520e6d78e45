//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per gateway route. When routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Service
    // ========================================================================

    pub async fn health(&self) -> Response {
        self.get("/health").await
    }

    pub async fn mode(&self) -> Response {
        self.get("/mcp/mode").await
    }

    // ========================================================================
    // MCP over REST
    // ========================================================================

    pub async fn initialize(&self) -> Response {
        self.post("/mcp/initialize", json!({})).await
    }

    pub async fn list_tools(&self) -> Response {
        self.post("/mcp/tools/list", json!({})).await
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Response {
        self.post(
            "/mcp/tools/call",
            json!({"name": name, "arguments": arguments}),
        )
        .await
    }

    pub async fn list_resources(&self) -> Response {
        self.post("/mcp/resources/list", json!({})).await
    }

    pub async fn read_resource(&self, uri: &str) -> Response {
        self.post("/mcp/resources/read", json!({"uri": uri})).await
    }

    /// Streams a tool call and collects every SSE `data:` payload
    pub async fn stream_tool_call(&self, name: &str, arguments: Value) -> (u16, Vec<Value>) {
        let response = self
            .post(
                "/mcp/stream/tools/call",
                json!({"name": name, "arguments": arguments}),
            )
            .await;
        let status = response.status().as_u16();
        let text = response.text().await.expect("Failed to read stream");

        let events = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).expect("Invalid event payload"))
            .collect();
        (status, events)
    }

    // ========================================================================
    // MCP JSON-RPC
    // ========================================================================

    pub async fn rpc(&self, message: Value) -> Response {
        self.post("/mcp", message).await
    }

    // ========================================================================
    // Direct Odoo access
    // ========================================================================

    pub async fn query(&self, model: &str, method: &str, args: Value) -> Response {
        self.post(
            "/odoo/query",
            json!({"model": model, "method": method, "args": args}),
        )
        .await
    }

    pub async fn models(&self) -> Response {
        self.get("/odoo/models").await
    }

    pub async fn model_fields(&self, model: &str) -> Response {
        self.get(&format!("/odoo/models/{}/fields", model)).await
    }
}
