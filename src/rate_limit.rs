//! Fixed-window rate limiter on top of a [`RateLimitStore`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::metrics::{STORE_ERRORS, STORE_LATENCY};
use crate::models::{RateLimitDecision, RateLimitRecord};
use crate::policy::RateLimitPolicy;
use crate::store::RateLimitStore;

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Count one request for `identifier` under `policy` at the current time.
    pub async fn check(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_at(identifier, policy, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Count one request at `now_ms`.
    ///
    /// Store failures fail open: the request is allowed as though it were the
    /// first of a new window. This is the only place that policy is applied.
    pub async fn check_at(
        &self,
        identifier: &str,
        policy: &RateLimitPolicy,
        now_ms: i64,
    ) -> RateLimitDecision {
        let key = policy.key_for(identifier);
        match self.try_check(&key, policy, now_ms).await {
            Ok(decision) => decision,
            Err(e) => {
                STORE_ERRORS.inc();
                warn!(key = %key, error = %e, "Rate limit store failed, allowing request");
                RateLimitDecision {
                    allowed: true,
                    limit: policy.max_requests,
                    remaining: policy.max_requests.saturating_sub(1),
                    reset_at: now_ms.saturating_add(policy.window_ms()),
                    retry_after: None,
                }
            }
        }
    }

    async fn try_check(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        now_ms: i64,
    ) -> Result<RateLimitDecision, StoreError> {
        let start = Instant::now();
        let record = self.store.hit(key, now_ms, policy.window_ms()).await;
        STORE_LATENCY.observe(start.elapsed().as_secs_f64());

        let decision = decide(&record?, policy, now_ms);
        debug!(
            key = %key,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Rate limit checked"
        );
        Ok(decision)
    }
}

fn decide(record: &RateLimitRecord, policy: &RateLimitPolicy, now_ms: i64) -> RateLimitDecision {
    let limit = policy.max_requests;
    let allowed = record.count <= i64::from(limit);
    let remaining = (i64::from(limit) - record.count).clamp(0, i64::from(limit)) as u32;

    // ceil((reset_at - now) / 1000), never below one second
    let retry_after = (!allowed).then(|| {
        let wait_ms = (record.reset_at - now_ms).max(0);
        (wait_ms.saturating_add(999) / 1000).max(1) as u64
    });

    RateLimitDecision {
        allowed,
        limit,
        remaining,
        reset_at: record.reset_at,
        retry_after,
    }
}
