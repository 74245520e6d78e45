//! Method Tools
//!
//! Arbitrary model method calls and report rendering.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::parse_arguments;
use crate::mcp::catalog::{ODOO_CALL, ODOO_REPORT};
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{McpRegistry, ToolResult};

/// Register method tools with the registry
pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(ODOO_CALL, call_handler);
    registry.register_tool(ODOO_REPORT, report_handler);
}

// ============================================================================
// odoo_call
// ============================================================================

#[derive(Debug, Deserialize)]
struct CallParams {
    model: String,
    method: String,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
}

async fn call_handler(ctx: ToolContext, args: Map<String, Value>) -> ToolResult {
    let params: CallParams = parse_arguments(args, &["model", "method"])?;

    let result = ctx
        .odoo
        .invoke(&params.model, &params.method, params.args, params.kwargs)
        .await?;

    Ok(json!({
        "model": params.model,
        "method": params.method,
        "result": result,
    }))
}

// ============================================================================
// odoo_report
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReportParams {
    report_name: String,
    record_ids: Vec<i64>,
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    "pdf".to_string()
}

async fn report_handler(ctx: ToolContext, args: Map<String, Value>) -> ToolResult {
    let params: ReportParams = parse_arguments(args, &["report_name", "record_ids"])?;

    // The format is reported back as requested; the backend picks the output type.
    let data = ctx
        .odoo
        .render_report(&params.report_name, &params.record_ids, json!({"form": {}}))
        .await?;

    Ok(json!({
        "report_name": params.report_name,
        "record_ids": params.record_ids,
        "format": params.format,
        "data": data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::McpError;
    use crate::odoo::client::tests::{client_for, FakeBackend};
    use crate::odoo::RpcError;
    use std::sync::Arc;

    fn ctx(backend: &Arc<FakeBackend>) -> ToolContext {
        ToolContext::new(Arc::new(client_for(backend)))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_call_defaults_args_and_kwargs() {
        let backend = FakeBackend::new(|_, _| Ok(json!([[1, "Acme"]])));

        let result = call_handler(
            ctx(&backend),
            args(json!({"model": "res.partner", "method": "name_search"})),
        )
        .await
        .unwrap();

        assert_eq!(
            result,
            json!({"model": "res.partner", "method": "name_search", "result": [[1, "Acme"]]})
        );
        let sent = backend.last_args();
        assert_eq!(sent[5], json!([]));
        assert_eq!(sent[6], json!({}));
    }

    #[tokio::test]
    async fn test_call_forwards_args_and_kwargs() {
        let backend = FakeBackend::new(|_, _| Ok(json!(3)));

        call_handler(
            ctx(&backend),
            args(json!({
                "model": "res.partner",
                "method": "search_count",
                "args": [[["is_company", "=", true]]],
                "kwargs": {"context": {"active_test": false}}
            })),
        )
        .await
        .unwrap();

        let sent = backend.last_args();
        assert_eq!(sent[5], json!([[["is_company", "=", true]]]));
        assert_eq!(sent[6], json!({"context": {"active_test": false}}));
    }

    #[tokio::test]
    async fn test_call_missing_method() {
        let backend = FakeBackend::new(|_, _| Ok(json!(null)));

        let err = call_handler(ctx(&backend), args(json!({"model": "res.partner"})))
            .await
            .unwrap_err();

        assert_eq!(err, McpError::MissingArgument("method".to_string()));
    }

    #[tokio::test]
    async fn test_call_remote_failure() {
        let backend = FakeBackend::new(|_, _| {
            Err(RpcError::Fault {
                code: 2,
                message: "The method 'nope' does not exist".to_string(),
            })
        });

        let err = call_handler(
            ctx(&backend),
            args(json!({"model": "res.partner", "method": "nope"})),
        )
        .await
        .unwrap_err();

        match err {
            McpError::RemoteCall(msg) => assert!(msg.contains("does not exist")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_report_defaults_to_pdf() {
        let backend = FakeBackend::new(|_, _| Ok(json!(["JVBERi0=", "pdf"])));

        let result = report_handler(
            ctx(&backend),
            args(json!({"report_name": "sale.report_saleorder", "record_ids": [5]})),
        )
        .await
        .unwrap();

        assert_eq!(result["format"], json!("pdf"));
        assert_eq!(result["record_ids"], json!([5]));
        assert_eq!(result["data"], json!(["JVBERi0=", "pdf"]));
        assert_eq!(backend.last_args()[6], json!({"data": {"form": {}}}));
    }
}
