use axum::response::IntoResponse;

use crate::metrics;

pub async fn metrics_handler() -> impl IntoResponse {
    metrics::render()
}
