use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use http_body_util::BodyExt;
use tower::ServiceExt;

use localelore_gateway::error::StoreError;
use localelore_gateway::{
    AnonymousResolver, MemoryStore, RateLimitGuard, RateLimitPolicy, RateLimitRecord,
    RateLimitStore, RateLimiter, TokenResolver, with_rate_limit,
};

// Resolves exactly one known token
struct StaticResolver;

#[async_trait]
impl TokenResolver for StaticResolver {
    async fn resolve(&self, token: &str) -> Option<String> {
        (token == "good-token").then(|| "42".to_string())
    }
}

// Store that always errors, counting attempts
#[derive(Default)]
struct DownStore {
    calls: AtomicUsize,
}

#[async_trait]
impl RateLimitStore for DownStore {
    async fn hit(&self, _: &str, _: i64, _: i64) -> Result<RateLimitRecord, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("timeout".to_string()))
    }

    async fn get(&self, _: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Err(StoreError::Unavailable("timeout".to_string()))
    }

    async fn purge_expired(&self, _: i64) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("timeout".to_string()))
    }
}

async fn fact() -> impl IntoResponse {
    ([("x-handler", "facts")], "ok")
}

fn app(
    store: Arc<dyn RateLimitStore>,
    resolver: Arc<dyn TokenResolver>,
    policy: RateLimitPolicy,
) -> Router {
    let guard = RateLimitGuard::new(Arc::new(RateLimiter::new(store)), resolver, policy);
    Router::new().route("/facts", with_rate_limit(get(fact), guard))
}

fn request(headers: &[(&str, &str)]) -> Request<Body> {
    request_with(Method::GET, headers)
}

fn request_with(method: Method, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/facts");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

fn header<'a>(res: &'a axum::response::Response, name: &str) -> &'a str {
    res.headers().get(name).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn allowed_response_keeps_handler_headers() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store, Arc::new(AnonymousResolver), RateLimitPolicy::READ);

    let res = app.oneshot(request(&[("x-real-ip", "192.0.2.1")])).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "x-handler"), "facts");
    assert_eq!(header(&res, "x-ratelimit-limit"), "120");
    assert_eq!(header(&res, "x-ratelimit-remaining"), "119");
    assert!(header(&res, "x-ratelimit-reset").parse::<i64>().unwrap() > 0);
    assert!(res.headers().get("retry-after").is_none());

    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn sixth_auth_attempt_gets_429() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone(), Arc::new(StaticResolver), RateLimitPolicy::AUTH);
    let auth = [("authorization", "Bearer good-token")];

    for expected in ["4", "3", "2", "1", "0"] {
        let res = app.clone().oneshot(request(&auth)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(header(&res, "x-ratelimit-remaining"), expected);
    }

    let res = app.clone().oneshot(request(&auth)).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&res, "x-ratelimit-limit"), "5");
    assert_eq!(header(&res, "x-ratelimit-remaining"), "0");
    let retry_after: u64 = header(&res, "retry-after").parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 900);
    assert!(res.headers().get("x-handler").is_none());

    let body = res.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Too many requests");
    assert_eq!(
        json["message"],
        format!("Rate limit exceeded. Please try again in {} seconds.", retry_after)
    );

    // Counted against the user, not the address
    assert_eq!(store.get("auth:user:42").await.unwrap().unwrap().count, 6);
}

#[tokio::test]
async fn bad_token_falls_back_to_ip() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone(), Arc::new(StaticResolver), RateLimitPolicy::CREATE);

    let res = app
        .oneshot(request(&[
            ("authorization", "Bearer expired-token"),
            ("cf-connecting-ip", "203.0.113.9"),
            ("x-forwarded-for", "198.51.100.3"),
        ]))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(store.get("create:ip:203.0.113.9").await.unwrap().unwrap().count, 1);
    assert!(store.get("create:user:42").await.unwrap().is_none());
}

#[tokio::test]
async fn clients_are_limited_independently() {
    let policy = RateLimitPolicy::new(std::time::Duration::from_secs(60), 1, "tiny");
    let app = app(Arc::new(MemoryStore::new()), Arc::new(AnonymousResolver), policy);

    let a = [("x-real-ip", "10.0.0.1")];
    let b = [("x-real-ip", "10.0.0.2")];

    assert_eq!(app.clone().oneshot(request(&a)).await.unwrap().status(), StatusCode::OK);
    assert_eq!(app.clone().oneshot(request(&b)).await.unwrap().status(), StatusCode::OK);
    assert_eq!(
        app.clone().oneshot(request(&a)).await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn store_outage_lets_traffic_through() {
    let store = Arc::new(DownStore::default());
    let app = app(store.clone(), Arc::new(AnonymousResolver), RateLimitPolicy::AUTH);

    for _ in 0..10 {
        let res = app.clone().oneshot(request(&[])).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(header(&res, "x-ratelimit-remaining"), "4");
    }
    // One store write per request, no retries
    assert_eq!(store.calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn unrouted_method_is_not_counted() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone(), Arc::new(AnonymousResolver), RateLimitPolicy::CREATE);

    let res = app
        .oneshot(request_with(Method::POST, &[("x-real-ip", "192.0.2.7")]))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(res.headers().get("x-ratelimit-limit").is_none());
    assert!(store.is_empty());
}
