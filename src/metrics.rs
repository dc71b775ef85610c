use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter = register_counter!(
        "gateway_requests_total",
        "Total number of rate-limited route requests"
    )
    .unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("gateway_rate_limited_total", "Requests rejected with 429").unwrap();
    pub static ref STORE_ERRORS: Counter =
        register_counter!("gateway_store_errors_total", "Store failures that failed open").unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("gateway_upstream_errors_total", "Failed upstream forwards").unwrap();
    pub static ref STORE_LATENCY: Histogram = register_histogram!(
        "gateway_store_latency_seconds",
        "Rate limit store round-trip in seconds"
    )
    .unwrap();
    pub static ref TOKEN_CACHE_SIZE: Gauge = register_gauge!(
        "gateway_token_cache_size",
        "Current number of cached token lookups"
    )
    .unwrap();
}

// Prometheus text exposition of the default registry
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
