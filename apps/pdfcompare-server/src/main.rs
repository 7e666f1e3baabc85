//! PDF comparison server
//!
//! Exposes the comparison pipeline over JSON for callers that cannot run
//! the WASM build:
//!
//! - Text analysis of a single PDF (text-based vs image-based)
//! - Semantic comparison of two PDFs, with the OCR gate
//! - Single-page overlay comparison
//!
//! PDFs travel base64-encoded in the request body. Parsing and diffing run
//! on the blocking pool under a per-request timeout.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use pdfcompare_core::CompareConfig;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
#[cfg(test)]
mod tests;

use api::{handle_analyze, handle_compare, handle_health, handle_overlay};

/// Command-line arguments for the comparison server
#[derive(Parser, Debug)]
#[command(name = "pdfcompare-server")]
#[command(about = "HTTP service for semantic and overlay PDF comparison")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Per-request processing timeout in milliseconds
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Maximum request body size in megabytes
    #[arg(long, default_value = "50")]
    max_upload_mb: usize,

    /// Characters a page needs before it counts as text-based
    #[arg(long, default_value = "50")]
    text_page_threshold: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Processing timeout in milliseconds
    pub timeout_ms: u64,
    /// Base configuration; requests may override individual fields
    pub config: Arc<CompareConfig>,
}

/// Routes and middleware shared by `main` and the endpoint tests. Rate
/// limiting needs peer addresses, so it is layered on in `main`.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // API endpoints
        .route("/api/analyze", post(handle_analyze))
        .route("/api/compare", post(handle_compare))
        .route("/api/overlay", post(handle_overlay))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdfcompare server on {}:{}", args.host, args.port);

    let config = CompareConfig {
        text_page_threshold: args.text_page_threshold,
        ..Default::default()
    };
    config.validate()?;

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit: {}", args.rate_limit))?,
    );

    let state = AppState {
        timeout_ms: args.timeout_ms,
        config: Arc::new(config),
    };

    let app = build_router(state, args.max_upload_mb * 1024 * 1024).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Upload limit: {} MB", args.max_upload_mb);
    info!("Processing timeout: {}ms", args.timeout_ms);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
