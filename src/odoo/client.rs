//! Odoo client
//!
//! Owns the single authenticated session to the backend and turns each
//! blocking RPC into an awaitable call by running it on tokio's blocking pool.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::transport::{RpcConnector, RpcError, RpcTransport};

/// Connection settings for the backend
#[derive(Clone)]
pub struct OdooConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for OdooConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdooConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum OdooError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Call failed for {model}.{method}: {source}")]
    RemoteCall {
        model: String,
        method: String,
        #[source]
        source: RpcError,
    },
}

/// Paging and ordering for `search` / `search_read`
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub offset: u64,
    pub limit: Option<u64>,
    pub order: Option<String>,
}

impl SearchOptions {
    pub fn limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    fn into_kwargs(self) -> Map<String, Value> {
        let mut kwargs = Map::new();
        kwargs.insert("offset".to_string(), json!(self.offset));
        if let Some(limit) = self.limit {
            kwargs.insert("limit".to_string(), json!(limit));
        }
        if let Some(order) = self.order.filter(|o| !o.is_empty()) {
            kwargs.insert("order".to_string(), json!(order));
        }
        kwargs
    }
}

#[derive(Default)]
struct Session {
    transport: Option<Arc<dyn RpcTransport>>,
    uid: Option<i64>,
    authenticated: bool,
}

pub struct OdooClient {
    config: OdooConfig,
    connector: Arc<dyn RpcConnector>,
    session: Mutex<Session>,
    /// Serializes first authentication so concurrent callers that find the
    /// session unauthenticated trigger a single handshake.
    auth_gate: tokio::sync::Mutex<()>,
}

impl OdooClient {
    pub fn new(config: OdooConfig, connector: Arc<dyn RpcConnector>) -> Self {
        Self {
            config,
            connector,
            session: Mutex::new(Session::default()),
            auth_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &OdooConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().authenticated
    }

    pub fn uid(&self) -> Option<i64> {
        self.session().uid
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authenticated_uid(&self) -> Option<i64> {
        let session = self.session();
        if session.authenticated {
            session.uid
        } else {
            None
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Opens the transport and authenticates. Does nothing when the session is
    /// already authenticated.
    pub async fn connect(&self) -> Result<(), OdooError> {
        if self.is_authenticated() {
            return Ok(());
        }

        match self.ensure_authenticated().await {
            Ok(uid) => {
                info!(
                    "Connected to Odoo at {} as user {} (uid {})",
                    self.config.url, self.config.username, uid
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to Odoo: {}", e);
                Err(e)
            }
        }
    }

    /// Runs the version + credentials handshake unconditionally and stores the
    /// returned user id.
    pub async fn authenticate(&self) -> Result<i64, OdooError> {
        let _guard = self.auth_gate.lock().await;
        self.handshake().await
    }

    /// Releases the transport and forgets the identity. Safe to call at any
    /// time, including before `connect`.
    pub async fn close(&self) {
        let transport = {
            let mut session = self.session();
            session.authenticated = false;
            session.uid = None;
            session.transport.take()
        };

        if let Some(transport) = transport {
            // The blocking HTTP client must not be torn down on a runtime worker.
            if let Err(e) = tokio::task::spawn_blocking(move || drop(transport)).await {
                warn!("Failed to release Odoo transport: {}", e);
            }
            info!("Odoo client connection closed");
        }
    }

    async fn ensure_authenticated(&self) -> Result<i64, OdooError> {
        if let Some(uid) = self.authenticated_uid() {
            return Ok(uid);
        }

        let _guard = self.auth_gate.lock().await;
        // Another caller may have finished the handshake while we waited.
        if let Some(uid) = self.authenticated_uid() {
            return Ok(uid);
        }
        self.handshake().await
    }

    fn forget_identity(&self) {
        let mut session = self.session();
        session.authenticated = false;
        session.uid = None;
    }

    async fn handshake(&self) -> Result<i64, OdooError> {
        let transport = match self.transport().await {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to open Odoo transport: {}", e);
                self.forget_identity();
                return Err(OdooError::Authentication(e.to_string()));
            }
        };

        let database = self.config.database.clone();
        let username = self.config.username.clone();
        let password = self.config.password.clone();

        let outcome = tokio::task::spawn_blocking(move || -> Result<(Value, Value), RpcError> {
            let version = transport.call("common", "version", Vec::new())?;
            let uid = transport.call(
                "common",
                "authenticate",
                vec![
                    json!(database),
                    json!(username),
                    json!(password),
                    json!({}),
                ],
            )?;
            Ok((version, uid))
        })
        .await
        .map_err(|e| RpcError::Worker(e.to_string()))
        .and_then(|r| r);

        let (version, uid) = match outcome {
            Ok(pair) => pair,
            Err(e) => {
                error!("Authentication failed: {}", e);
                self.forget_identity();
                return Err(OdooError::Authentication(e.to_string()));
            }
        };

        let server_version = version
            .get("server_version")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        info!("Odoo version: {}", server_version);

        let uid = match uid.as_i64().filter(|id| *id > 0) {
            Some(uid) => uid,
            None => {
                error!("Authentication failed - invalid credentials");
                self.forget_identity();
                return Err(OdooError::Authentication(
                    "invalid credentials".to_string(),
                ));
            }
        };

        {
            let mut session = self.session();
            session.uid = Some(uid);
            session.authenticated = true;
        }
        info!("Authenticated as user ID: {}", uid);
        Ok(uid)
    }

    async fn transport(&self) -> Result<Arc<dyn RpcTransport>, RpcError> {
        if let Some(transport) = self.session().transport.clone() {
            return Ok(transport);
        }

        let connector = self.connector.clone();
        let opened = tokio::task::spawn_blocking(move || connector.open())
            .await
            .map_err(|e| RpcError::Worker(e.to_string()))??;

        let (transport, loser) = {
            let mut session = self.session();
            match session.transport.clone() {
                Some(existing) => (existing, Some(opened)),
                None => {
                    session.transport = Some(opened.clone());
                    (opened, None)
                }
            }
        };

        if let Some(loser) = loser {
            // A concurrent caller installed its transport first.
            if let Err(e) = tokio::task::spawn_blocking(move || drop(loser)).await {
                warn!("Failed to release duplicate Odoo transport: {}", e);
            }
        }
        Ok(transport)
    }

    // ========================================================================
    // Remote calls
    // ========================================================================

    /// Runs `model.method(*args, **kwargs)` on the backend through
    /// `object.execute_kw`, authenticating first if needed.
    pub async fn invoke(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, OdooError> {
        let uid = self.ensure_authenticated().await?;

        let remote_error = |source: RpcError| {
            error!("Call failed for {}.{}: {}", model, method, source);
            OdooError::RemoteCall {
                model: model.to_string(),
                method: method.to_string(),
                source,
            }
        };

        let transport = self.transport().await.map_err(remote_error)?;

        let params = vec![
            json!(self.config.database),
            json!(uid),
            json!(self.config.password),
            json!(model),
            json!(method),
            Value::Array(args),
            Value::Object(kwargs),
        ];

        let result = tokio::task::spawn_blocking(move || {
            transport.call("object", "execute_kw", params)
        })
        .await
        .map_err(|e| RpcError::Worker(e.to_string()))
        .and_then(|r| r)
        .map_err(remote_error)?;

        debug!("Called {}.{}", model, method);
        Ok(result)
    }

    pub async fn search(
        &self,
        model: &str,
        domain: Value,
        options: SearchOptions,
    ) -> Result<Value, OdooError> {
        self.invoke(model, "search", vec![domain], options.into_kwargs())
            .await
    }

    pub async fn read(
        &self,
        model: &str,
        ids: &[i64],
        fields: &[String],
    ) -> Result<Value, OdooError> {
        let mut kwargs = Map::new();
        if !fields.is_empty() {
            kwargs.insert("fields".to_string(), json!(fields));
        }
        self.invoke(model, "read", vec![json!(ids)], kwargs).await
    }

    pub async fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
        options: SearchOptions,
    ) -> Result<Value, OdooError> {
        let mut kwargs = options.into_kwargs();
        if !fields.is_empty() {
            kwargs.insert("fields".to_string(), json!(fields));
        }
        self.invoke(model, "search_read", vec![domain], kwargs).await
    }

    pub async fn create(&self, model: &str, values: Value) -> Result<Value, OdooError> {
        self.invoke(model, "create", vec![values], Map::new()).await
    }

    pub async fn write(&self, model: &str, ids: &[i64], values: Value) -> Result<Value, OdooError> {
        self.invoke(model, "write", vec![json!(ids), values], Map::new())
            .await
    }

    pub async fn unlink(&self, model: &str, ids: &[i64]) -> Result<Value, OdooError> {
        self.invoke(model, "unlink", vec![json!(ids)], Map::new())
            .await
    }

    pub async fn fields_get(&self, model: &str, fields: &[String]) -> Result<Value, OdooError> {
        let args = if fields.is_empty() {
            Vec::new()
        } else {
            vec![json!(fields)]
        };
        self.invoke(model, "fields_get", args, Map::new()).await
    }

    /// Installed, non-transient models
    pub async fn list_models(&self) -> Result<Value, OdooError> {
        self.search_read(
            "ir.model",
            json!([["transient", "=", false]]),
            &["model", "name", "info"],
            SearchOptions::default(),
        )
        .await
    }

    pub async fn get_server_info(&self) -> Result<Value, OdooError> {
        let database_info = self
            .search_read(
                "ir.config_parameter",
                json!([[
                    "key",
                    "in",
                    ["database.expiration_date", "database.enterprise_code"]
                ]]),
                &["key", "value"],
                SearchOptions::default(),
            )
            .await?;

        let installed_modules = self
            .search_read(
                "ir.module.module",
                json!([["state", "=", "installed"]]),
                &["name", "shortdesc", "author", "version"],
                SearchOptions::limit(50),
            )
            .await?;

        Ok(json!({
            "database": self.config.database,
            "url": self.config.url,
            "user_id": self.uid(),
            "database_info": database_info,
            "installed_modules": installed_modules,
        }))
    }

    pub async fn get_reports(&self) -> Result<Value, OdooError> {
        self.search_read(
            "ir.actions.report",
            json!([]),
            &["name", "report_name", "model", "report_type"],
            SearchOptions::default(),
        )
        .await
    }

    pub async fn render_report(
        &self,
        report_name: &str,
        record_ids: &[i64],
        data: Value,
    ) -> Result<Value, OdooError> {
        let mut kwargs = Map::new();
        kwargs.insert("data".to_string(), data);
        self.invoke(
            "ir.actions.report",
            "_render",
            vec![json!(report_name), json!(record_ids)],
            kwargs,
        )
        .await
    }
}
