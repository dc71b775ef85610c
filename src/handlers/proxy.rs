use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING, UPGRADE};
use axum::response::Response;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::metrics::UPSTREAM_ERRORS;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Headers that describe a single connection, not the message
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in [CONNECTION, TRANSFER_ENCODING, UPGRADE, HOST, CONTENT_LENGTH] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// Forward an allowed request to the backend and relay its answer as-is
pub async fn proxy_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, GatewayError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| GatewayError::Body(e.to_string()))?;

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.upstream, path);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    debug!(method = %parts.method, url = %url, "Forwarding request");

    let upstream = match state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(bytes)
        .send()
        .await
    {
        Ok(res) => res,
        Err(e) => {
            UPSTREAM_ERRORS.inc();
            warn!(url = %url, error = %e, "Upstream request failed");
            return Err(e.into());
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(e) => {
            UPSTREAM_ERRORS.inc();
            warn!(url = %url, error = %e, "Upstream response body failed");
            return Err(e.into());
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
