//! Shared constants for end-to-end tests
//!
//! The fake Odoo backend serves fixed data; when it changes, update only
//! this file.

// ============================================================================
// Fake Odoo data
// ============================================================================

/// Number of `res.partner` records the fake backend holds
pub const PARTNER_COUNT: usize = 25;

/// Id returned for every `create`
pub const CREATED_ID: i64 = 42;

/// Models reported by `ir.model`
pub const MODEL_NAMES: [&str; 3] = ["res.partner", "res.users", "sale.order"];

/// User id handed out by `common.authenticate`
pub const TEST_UID: i64 = 7;

/// Version reported by `common.version`
pub const SERVER_VERSION: &str = "17.0";

// ============================================================================
// Server settings
// ============================================================================

/// Records per streamed chunk
pub const STREAM_CHUNK_SIZE: usize = 10;

/// Name reported in `initialize` and `/health`
pub const SERVER_NAME: &str = "odoo-mcp-test";

/// Write calls allowed per window, kept small so limits are reachable
pub const WRITE_LIMIT: u32 = 3;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual requests
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
