use super::request_id::{REQUEST_ID_HEADER, request_id_middleware};
use axum::{Router, extract::Request, middleware::from_fn};
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

/// Span wrapping one HTTP request, tagged with its `x-request-id`
pub fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Wrap `router` in request logging. The request id is assigned outside
/// the trace layer so the span always sees it.
pub fn with_request_tracing<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(request_span)
        .on_request(|request: &Request, _span: &Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    router
        .layer(trace_layer)
        .layer(from_fn(request_id_middleware))
}
