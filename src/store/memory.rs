use async_trait::async_trait;
use dashmap::DashMap;

use super::RateLimitStore;
use crate::error::StoreError;
use crate::models::RateLimitRecord;

/// In-process store. The DashMap entry guard holds the shard lock for the
/// whole read-modify-write, so hits on one key are serialized.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<RateLimitRecord, StoreError> {
        let record = self
            .records
            .entry(key.to_string())
            .and_modify(|r| r.apply_hit(now_ms, window_ms))
            .or_insert_with(|| RateLimitRecord::fresh(key, now_ms, window_ms));
        Ok(record.clone())
    }

    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| r.clone()))
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        let before = self.records.len();
        self.records.retain(|_, r| !r.is_expired(now_ms));
        Ok(before.saturating_sub(self.records.len()) as u64)
    }
}
