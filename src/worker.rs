use std::sync::Arc;

use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

use crate::auth::SupabaseTokenResolver;
use crate::store::RateLimitStore;

/// Periodically drops counters whose window has ended and stale token
/// lookups. Counter rows are otherwise never deleted, so an in-memory store
/// would grow without bound.
pub async fn sweeper(
    store: Option<Arc<dyn RateLimitStore>>,
    resolver: Option<Arc<SupabaseTokenResolver>>,
    sweep_interval: Duration,
) {
    let mut interval = interval(sweep_interval);

    info!(interval = ?sweep_interval, "Counter sweeper started");

    loop {
        interval.tick().await;
        if let Some(store) = &store {
            sweep_once(store.as_ref(), chrono::Utc::now().timestamp_millis()).await;
        }
        if let Some(resolver) = &resolver {
            resolver.prune();
        }
    }
}

/// One pass; failures are logged and retried on the next tick
pub async fn sweep_once(store: &dyn RateLimitStore, now_ms: i64) -> u64 {
    match store.purge_expired(now_ms).await {
        Ok(0) => 0,
        Ok(removed) => {
            debug!(removed, "Purged expired rate limit counters");
            removed
        }
        Err(e) => {
            warn!(error = %e, "Failed to purge expired counters");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn sweep_removes_expired_counters() {
        let store = MemoryStore::new();
        store.hit("read:ip:1.1.1.1", 0, 60_000).await.unwrap();
        store.hit("read:ip:2.2.2.2", 100_000, 60_000).await.unwrap();

        assert_eq!(sweep_once(&store, 120_000).await, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(sweep_once(&store, 120_000).await, 0);
    }
}
