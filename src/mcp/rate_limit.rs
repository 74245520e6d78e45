//! MCP Rate Limiting
//!
//! Fixed-window counters per client, split into read and write tool calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::catalog::required_permissions;
use super::permissions::PermissionLevel;

/// Which budget a tool call is charged against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    Read,
    Write,
}

impl ToolCategory {
    /// Tools that need write or delete access count as writes.
    pub fn of_tool(tool_name: &str) -> Self {
        let mutates = required_permissions(tool_name)
            .iter()
            .any(|p| matches!(p, PermissionLevel::Write | PermissionLevel::Delete));
        if mutates {
            ToolCategory::Write
        } else {
            ToolCategory::Read
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub read_per_window: u32,
    pub write_per_window: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            read_per_window: 100,
            write_per_window: 30,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct ClientWindow {
    read_count: u32,
    write_count: u32,
    window_start: Instant,
}

impl ClientWindow {
    fn new() -> Self {
        Self {
            read_count: 0,
            write_count: 0,
            window_start: Instant::now(),
        }
    }

    fn reset_if_expired(&mut self, window: Duration) {
        if self.window_start.elapsed() >= window {
            self.read_count = 0;
            self.write_count = 0;
            self.window_start = Instant::now();
        }
    }
}

pub struct McpRateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, ClientWindow>>,
}

impl McpRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<String, ClientWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a call if the client still has budget in the current window.
    /// Returns `Err(retry_after_secs)` otherwise.
    pub fn check_and_record(&self, client: &str, category: ToolCategory) -> Result<(), u32> {
        let mut windows = self.windows();
        let state = windows
            .entry(client.to_string())
            .or_insert_with(ClientWindow::new);

        state.reset_if_expired(self.config.window);

        let (current, limit) = match category {
            ToolCategory::Read => (&mut state.read_count, self.config.read_per_window),
            ToolCategory::Write => (&mut state.write_count, self.config.write_per_window),
        };

        if *current >= limit {
            let remaining = self
                .config
                .window
                .saturating_sub(state.window_start.elapsed())
                .as_secs();
            return Err((remaining as u32).max(1));
        }

        *current += 1;
        Ok(())
    }

    /// (read, write) calls recorded for a client in its current window
    pub fn usage(&self, client: &str) -> Option<(u32, u32)> {
        self.windows()
            .get(client)
            .map(|w| (w.read_count, w.write_count))
    }

    /// Drops clients idle for more than five windows
    pub fn cleanup_stale_entries(&self) {
        let threshold = self.config.window * 5;
        self.windows()
            .retain(|_, w| w.window_start.elapsed() < threshold);
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows().len()
    }
}

impl Default for McpRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
