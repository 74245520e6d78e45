use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use super::mcp_routes::make_mcp_routes;
use super::odoo_routes::make_odoo_routes;
use super::state::ServerState;
use super::{log_requests, ServerConfig};
use crate::config::AppConfig;
use crate::mcp::{McpState, PermissionManager, StreamingEncoder, ToolGateway};
use crate::mcp::rate_limit::McpRateLimiter;
use crate::odoo::{OdooClient, RpcConnector};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

pub fn make_app(state: ServerState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    make_mcp_routes(state.clone())
        .merge(make_odoo_routes(state.clone()))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

/// Wires the gateway stack for `config` on top of the given backend connector.
/// The backend is not contacted until the first call needs it.
pub fn build_state(config: &AppConfig, connector: Arc<dyn RpcConnector>) -> Result<ServerState> {
    let odoo = Arc::new(OdooClient::new(config.odoo.clone(), connector));
    let permissions = PermissionManager::from_mode(config.mode);
    let gateway = Arc::new(ToolGateway::for_odoo(permissions, odoo)?);
    let rate_limiter = Arc::new(McpRateLimiter::new(config.rate_limit.clone()));
    let mcp_state = McpState::new(
        gateway,
        rate_limiter,
        StreamingEncoder::new(config.stream_chunk_size),
        config.server_name.clone(),
    );

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        host: config.host.clone(),
        port: config.port,
        cors_origins: config.cors_origins.clone(),
    };
    Ok(ServerState::new(server_config, Arc::new(mcp_state)))
}

/// Serves `state` on an already bound listener until `shutdown` resolves,
/// then closes the backend session.
pub async fn serve<F>(listener: TcpListener, state: ServerState, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let mcp_state = state.mcp_state.clone();

    let rate_limiter = mcp_state.rate_limiter.clone();
    let cleanup_period = rate_limiter.config().window;
    let cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_period);
        loop {
            interval.tick().await;
            rate_limiter.cleanup_stale_entries();
        }
    });

    let app = make_app(state);
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await;

    cleanup.abort();
    mcp_state.gateway.odoo().close().await;
    info!("Server stopped");

    Ok(served?)
}

pub async fn run_server(config: AppConfig, connector: Arc<dyn RpcConnector>) -> Result<()> {
    let state = build_state(&config, connector)?;

    let address = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", address);

    serve(listener, state, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    })
    .await
}
