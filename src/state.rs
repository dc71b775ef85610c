use std::sync::Arc;

use crate::auth::TokenResolver;
use crate::rate_limit::RateLimiter;

/// app's shared state
#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    /// Base URL requests are forwarded to
    pub upstream: String,
    pub limiter: Arc<RateLimiter>,
    pub resolver: Arc<dyn TokenResolver>,
}

impl AppState {
    pub fn new(
        client: reqwest::Client,
        upstream: &str,
        limiter: Arc<RateLimiter>,
        resolver: Arc<dyn TokenResolver>,
    ) -> Self {
        Self {
            client,
            upstream: upstream.trim_end_matches('/').to_string(),
            limiter,
            resolver,
        }
    }
}
