use super::request_id::REQUEST_ID_HEADER;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

/// Emit one `request_completed` record per request under the `metrics` target.
///
/// `route` is the matched route template (`/api/extract-text`), or the raw
/// path for requests served by the UI fallback. Provider failures surface
/// as 5xx and are logged at warn level.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        warn!(target: "metrics", %method, %route, status, latency_ms, %request_id, "request_completed");
    } else {
        info!(target: "metrics", %method, %route, status, latency_ms, %request_id, "request_completed");
    }

    response
}
