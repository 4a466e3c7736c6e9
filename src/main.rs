use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use image_answer_backend::config::AppConfig;
use image_answer_backend::services::answer_service::AnswerService;
use image_answer_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_answer_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Image Answer Backend...");

    // 2. Configuration
    let config = AppConfig::from_env();
    config
        .validate()
        .context("invalid configuration (check OCR_SPACE_KEY and GROQ_API_KEY)")?;
    info!(
        "⚙️  Config: Max Upload={}KB, OCR={}, Completion={} ({})",
        config.max_upload_size / 1024,
        config.ocr.endpoint,
        config.completion.endpoint,
        config.completion.model
    );

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;
    if let Some(dir) = &config.static_dir {
        info!("🗂️  Serving UI bundle from {}", dir.display());
    }

    // 3. Services
    let answer_service = Arc::new(AnswerService::from_config(&config)?);
    let state = AppState {
        answer_service,
        config,
    };

    let app = create_app(state);

    // 4. Serve
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Server running at http://localhost:{}", args.port);
    info!(
        "📖 Swagger UI documentation: http://localhost:{}/swagger-ui",
        args.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
