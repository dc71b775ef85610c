//! Axum middleware that applies a [`RateLimitPolicy`] to a route.
//!
//! ```ignore
//! let guard = RateLimitGuard::new(limiter, resolver, RateLimitPolicy::CREATE);
//! let app = Router::new().route("/facts", with_rate_limit(post(create_fact), guard));
//! ```

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use tracing::info;

use crate::auth::TokenResolver;
use crate::identity::{bearer_token, client_identifier};
use crate::metrics::{RATE_LIMITED, REQUEST_TOTAL};
use crate::models::{RateLimitDecision, TooManyRequestsBody};
use crate::policy::RateLimitPolicy;
use crate::rate_limit::RateLimiter;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Everything the middleware needs for one endpoint class.
#[derive(Clone)]
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
    resolver: Arc<dyn TokenResolver>,
    policy: RateLimitPolicy,
}

impl RateLimitGuard {
    pub fn new(
        limiter: Arc<RateLimiter>,
        resolver: Arc<dyn TokenResolver>,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            limiter,
            resolver,
            policy,
        }
    }

    /// Same limiter and resolver, different policy.
    pub fn with_policy(&self, policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }
}

/// Guard the methods registered on `method_router`. Methods it does not
/// handle still get 405 from the fallback without touching the limiter.
pub fn with_rate_limit<S>(
    method_router: MethodRouter<S>,
    guard: RateLimitGuard,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    method_router.route_layer(from_fn_with_state(guard, rate_limit))
}

/// Counts the request, then either rejects it with 429 or runs the inner
/// handler and stamps the rate-limit headers onto its response.
pub async fn rate_limit(
    State(guard): State<RateLimitGuard>,
    request: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();

    let token = bearer_token(request.headers()).map(str::to_owned);
    let user_id = match token {
        Some(token) => guard.resolver.resolve(&token).await,
        None => None,
    };
    let identifier = client_identifier(request.headers(), user_id.as_deref());

    let decision = guard.limiter.check(&identifier, &guard.policy).await;

    if !decision.allowed {
        RATE_LIMITED.inc();
        info!(
            identifier = %identifier,
            prefix = guard.policy.key_prefix,
            "Rate limit exceeded"
        );
        return too_many_requests(&decision);
    }

    let mut response = next.run(request).await;
    insert_limit_headers(response.headers_mut(), &decision);
    response
}

fn too_many_requests(decision: &RateLimitDecision) -> Response {
    let retry_after = decision.retry_after.unwrap_or(1);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(TooManyRequestsBody::new(retry_after)),
    )
        .into_response();

    let headers = response.headers_mut();
    insert_limit_headers(headers, decision);
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u32));
    headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

fn insert_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_epoch_secs()));
}
