//! Backend access: the blocking RPC transport and the async client on top of it.

pub mod client;
pub mod transport;

pub use client::{OdooClient, OdooConfig, OdooError, SearchOptions};
pub use transport::{JsonRpcConnector, RpcConnector, RpcError, RpcTransport};
