//! Bearer token to user id resolution.
//!
//! Resolvers never fail: an invalid, expired or unverifiable token simply
//! yields `None` and the request is limited by IP instead.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::metrics::TOKEN_CACHE_SIZE;
use crate::models::AuthUser;

#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<String>;
}

/// Treats every caller as anonymous
pub struct AnonymousResolver;

#[async_trait]
impl TokenResolver for AnonymousResolver {
    async fn resolve(&self, _token: &str) -> Option<String> {
        None
    }
}

/// Cached user id with timestamp
#[derive(Clone)]
struct CacheEntry {
    user_id: String,
    created_at: Instant,
}

/// Cache key is the token's digest, so raw tokens are never kept in memory
fn make_cache_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verifies tokens against the Supabase auth API (`GET /auth/v1/user`).
pub struct SupabaseTokenResolver {
    client: reqwest::Client,
    user_url: String,
    anon_key: Option<String>,
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl SupabaseTokenResolver {
    pub fn new(
        client: reqwest::Client,
        supabase_url: &str,
        anon_key: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            user_url: format!("{}/auth/v1/user", supabase_url.trim_end_matches('/')),
            anon_key,
            cache: DashMap::new(),
            ttl,
        }
    }

    fn cached(&self, cache_key: &str) -> Option<String> {
        let entry = self.cache.get(cache_key)?;
        if entry.created_at.elapsed() < self.ttl {
            return Some(entry.user_id.clone());
        }
        drop(entry);
        self.cache.remove(cache_key);
        TOKEN_CACHE_SIZE.set(self.cache.len() as f64);
        None
    }

    async fn fetch_user(&self, token: &str) -> Result<Option<String>, reqwest::Error> {
        let mut request = self.client.get(&self.user_url).bearer_auth(token);
        if let Some(key) = &self.anon_key {
            request = request.header("apikey", key);
        }

        let res = request.timeout(Duration::from_secs(5)).send().await?;
        if !res.status().is_success() {
            debug!(status = %res.status(), "Token rejected by auth service");
            return Ok(None);
        }
        let user = res.json::<AuthUser>().await?;
        Ok(Some(user.id))
    }

    /// Drop expired lookups
    pub fn prune(&self) {
        self.cache.retain(|_, e| e.created_at.elapsed() < self.ttl);
        TOKEN_CACHE_SIZE.set(self.cache.len() as f64);
    }
}

#[async_trait]
impl TokenResolver for SupabaseTokenResolver {
    async fn resolve(&self, token: &str) -> Option<String> {
        let cache_key = make_cache_key(token);
        if let Some(user_id) = self.cached(&cache_key) {
            return Some(user_id);
        }

        match self.fetch_user(token).await {
            Ok(Some(user_id)) => {
                self.cache.insert(
                    cache_key,
                    CacheEntry {
                        user_id: user_id.clone(),
                        created_at: Instant::now(),
                    },
                );
                TOKEN_CACHE_SIZE.set(self.cache.len() as f64);
                Some(user_id)
            }
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Token lookup failed, treating caller as anonymous");
                None
            }
        }
    }
}
