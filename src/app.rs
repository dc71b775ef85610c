use axum::Router;
use axum::routing::{MethodFilter, get, on, post};

use crate::handlers::{health_handler, metrics_handler, proxy_handler};
use crate::middleware::{RateLimitGuard, with_rate_limit};
use crate::policy::RateLimitPolicy;
use crate::state::AppState;

/// Methods passed through on catch-all routes. Registered explicitly so the
/// guard sits on real method endpoints and anything else falls to 405.
fn forwarded_methods() -> MethodFilter {
    MethodFilter::GET
        .or(MethodFilter::POST)
        .or(MethodFilter::PUT)
        .or(MethodFilter::PATCH)
        .or(MethodFilter::DELETE)
        .or(MethodFilter::OPTIONS)
}

/// Gateway routes. Each endpoint class carries its own guard on the methods
/// it serves; `rest_policy` applies to the `/rest/v1` data API.
pub fn build_router(state: AppState, rest_policy: RateLimitPolicy) -> Router {
    let guard = RateLimitGuard::new(
        state.limiter.clone(),
        state.resolver.clone(),
        RateLimitPolicy::STANDARD,
    );
    let guarded = |policy: RateLimitPolicy| guard.with_policy(policy);

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/auth/v1/{*path}",
            with_rate_limit(
                on(forwarded_methods(), proxy_handler),
                guarded(RateLimitPolicy::AUTH),
            ),
        )
        .route(
            "/functions/v1/{*path}",
            with_rate_limit(get(proxy_handler), guarded(RateLimitPolicy::READ)).merge(
                with_rate_limit(post(proxy_handler), guarded(RateLimitPolicy::CREATE)),
            ),
        )
        .route(
            "/rest/v1/{*path}",
            with_rate_limit(on(forwarded_methods(), proxy_handler), guarded(rest_policy)),
        )
        .route(
            "/webhooks/{*path}",
            with_rate_limit(post(proxy_handler), guarded(RateLimitPolicy::WEBHOOK)),
        )
        .with_state(state)
}
