//! End-to-end tests for server-sent event tool calls

mod common;

use common::{TestClient, TestServer, PARTNER_COUNT, STREAM_CHUNK_SIZE};
use serde_json::{json, Value};

fn event_types(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_search_is_streamed_in_chunks() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let (status, events) = client
        .stream_tool_call("odoo_search", json!({"model": "res.partner"}))
        .await;
    assert_eq!(status, 200);

    let expected_chunks = PARTNER_COUNT.div_ceil(STREAM_CHUNK_SIZE);
    let types = event_types(&events);
    assert_eq!(types.len(), expected_chunks + 2);
    assert_eq!(types.first(), Some(&"start"));
    assert_eq!(types.last(), Some(&"end"));
    assert!(types[1..=expected_chunks].iter().all(|t| *t == "chunk"));

    assert_eq!(events[0]["tool"], json!("odoo_search"));

    let mut received = 0;
    for chunk in &events[1..=expected_chunks] {
        received += chunk["data"].as_array().unwrap().len();
        assert_eq!(chunk["progress"]["current"], json!(received));
        assert_eq!(chunk["progress"]["total"], json!(PARTNER_COUNT));
    }
    assert_eq!(received, PARTNER_COUNT);
}

#[tokio::test]
async fn test_non_record_result_is_one_chunk() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let (_, events) = client
        .stream_tool_call(
            "odoo_create",
            json!({"model": "res.partner", "values": {"name": "x"}}),
        )
        .await;

    assert_eq!(event_types(&events), vec!["start", "chunk", "end"]);
    assert_eq!(events[1]["data"]["success"], json!(true));
    assert!(events[1].get("progress").is_none());
}

#[tokio::test]
async fn test_denied_call_streams_single_error() {
    let server = TestServer::spawn_readonly().await;
    let client = TestClient::new(server.base_url.clone());

    let (status, events) = client
        .stream_tool_call("odoo_unlink", json!({"model": "res.partner", "ids": [1]}))
        .await;
    assert_eq!(status, 200);

    assert_eq!(event_types(&events), vec!["start", "error"]);
    assert_eq!(
        events[1]["message"],
        json!("Tool 'odoo_unlink' not allowed in readonly mode")
    );
    assert!(server.odoo.executed().is_empty());
}

#[tokio::test]
async fn test_malformed_stream_request_is_rejected_before_streaming() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/mcp/stream/tools/call", server.base_url))
        .header("content-type", "application/json")
        .body("{\"arguments\": {}}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
