use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures talking to the rate-limit store. Never surfaced to API clients:
/// the limiter converts them into an "allowed" decision.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures forwarding an allowed request upstream
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("invalid request body: {0}")]
    Body(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            GatewayError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Bad gateway"),
            GatewayError::Body(_) => (StatusCode::BAD_REQUEST, "Bad request"),
        };
        let body = serde_json::json!({
            "error": error,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
