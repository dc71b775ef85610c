//! Durable counter state for the rate limiter.
//!
//! The limiter only talks to [`RateLimitStore`]; adapters decide where rows
//! live. Every adapter must make [`RateLimitStore::hit`] atomic per key so
//! concurrent requests for the same key cannot both observe the same count.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::RateLimitRecord;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one request against `key` and return the row as written.
    ///
    /// Missing rows and rows whose `reset_at` is before `now_ms` start a new
    /// window (`count = 1`, `reset_at = now_ms + window_ms`); otherwise
    /// `count` is incremented and `reset_at` is left alone.
    async fn hit(&self, key: &str, now_ms: i64, window_ms: i64)
    -> Result<RateLimitRecord, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Drop rows whose window ended before `now_ms`. Returns rows removed.
    async fn purge_expired(&self, now_ms: i64) -> Result<u64, StoreError>;
}
