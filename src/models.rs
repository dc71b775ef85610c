use serde::{Deserialize, Serialize};

/// One row per limiting key ("<prefix>:<identifier>")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub key: String,
    pub count: i64,
    /// Epoch millis, end of the current window
    pub reset_at: i64,
    /// Epoch millis, informational
    pub last_request_at: i64,
}

impl RateLimitRecord {
    /// First request of a window
    pub fn fresh(key: &str, now_ms: i64, window_ms: i64) -> Self {
        Self {
            key: key.to_string(),
            count: 1,
            reset_at: now_ms.saturating_add(window_ms),
            last_request_at: now_ms,
        }
    }

    /// Window is over only once reset_at is strictly in the past
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.reset_at < now_ms
    }

    /// Apply one request: restart an expired window, otherwise count it
    pub fn apply_hit(&mut self, now_ms: i64, window_ms: i64) {
        if self.is_expired(now_ms) {
            self.count = 1;
            self.reset_at = now_ms.saturating_add(window_ms);
        } else {
            self.count += 1;
        }
        self.last_request_at = now_ms;
    }
}

/// Outcome of a single limiter check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch millis
    pub reset_at: i64,
    /// Seconds, only set when denied
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    /// Reset time as epoch seconds, rounded up so clients never retry early
    pub fn reset_epoch_secs(&self) -> i64 {
        self.reset_at.div_euclid(1000) + i64::from(self.reset_at.rem_euclid(1000) != 0)
    }
}

/// 429 response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TooManyRequestsBody {
    pub error: String,
    pub message: String,
}

impl TooManyRequestsBody {
    pub fn new(retry_after: u64) -> Self {
        Self {
            error: "Too many requests".to_string(),
            message: format!(
                "Rate limit exceeded. Please try again in {} seconds.",
                retry_after
            ),
        }
    }
}

/// Minimal view of the auth service's /user payload
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
}
