//! Named rate-limit policies, one per endpoint class.

use std::time::Duration;

/// Fixed-window policy: at most `max_requests` per `window` for each key
/// under `key_prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
    pub key_prefix: &'static str,
}

impl RateLimitPolicy {
    /// Login and signup endpoints.
    pub const AUTH: Self = Self::new(Duration::from_secs(15 * 60), 5, "auth");
    /// Content-creation endpoints.
    pub const CREATE: Self = Self::new(Duration::from_secs(60), 10, "create");
    /// General API.
    pub const STANDARD: Self = Self::new(Duration::from_secs(60), 60, "standard");
    /// Read-only endpoints.
    pub const READ: Self = Self::new(Duration::from_secs(60), 120, "read");
    /// Inbound webhook receivers.
    pub const WEBHOOK: Self = Self::new(Duration::from_secs(60), 100, "webhook");

    pub const PRESETS: [Self; 5] = [
        Self::AUTH,
        Self::CREATE,
        Self::STANDARD,
        Self::READ,
        Self::WEBHOOK,
    ];

    pub const fn new(window: Duration, max_requests: u32, key_prefix: &'static str) -> Self {
        Self {
            window,
            max_requests,
            key_prefix,
        }
    }

    /// Look a preset up by name, ignoring case.
    pub fn preset(name: &str) -> Option<Self> {
        Self::PRESETS
            .into_iter()
            .find(|p| p.key_prefix.eq_ignore_ascii_case(name))
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }

    /// Store key for an identifier under this policy.
    pub fn key_for(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix, identifier)
    }
}
