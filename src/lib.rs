pub mod api;
pub mod config;
pub mod models;
pub mod services;

use crate::api::middleware::trace::with_request_tracing;
use crate::config::AppConfig;
use crate::services::answer_service::AnswerService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Headroom on top of the image size for multipart boundaries and headers
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::extract::extract_text,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::ExtractTextResponse,
            models::ErrorResponse,
            models::ImageUpload,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "extract", description = "Image question answering"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub answer_service: Arc<AnswerService>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/extract-text",
            post(api::handlers::extract::extract_text),
        );

    // Single-page UI: unknown paths resolve to index.html
    let router = match &state.config.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    let router = router.layer(from_fn(api::middleware::metrics::metrics_middleware));

    with_request_tracing(router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_size + MULTIPART_OVERHEAD,
        ))
        .with_state(state)
}
