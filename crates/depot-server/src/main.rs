//! Depot RS Server
//!
//! HTTP server exposing the image resize endpoint, backed by the in-memory
//! entity store and filesystem storage. A background task periodically sweeps
//! generated variants past their TTL.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depot_api::AppState;
use depot_core::config::DepotConfig;
use depot_files::{FileService, MemoryFileStore};
use depot_images::VariantResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    init_tracing();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = DepotConfig::from_env();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        storage_root = %config.paths.storage_root.display(),
        static_root = %config.paths.static_root.display(),
        "Starting Depot RS"
    );

    let state = build_state(config.clone());
    let app = build_router(state);

    // Periodic variant sweep
    spawn_sweeper(config.clone());

    // Start server
    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,depot_server=debug,depot_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Wire the services into shared application state
fn build_state(config: DepotConfig) -> AppState {
    let files = Arc::new(FileService::new(
        Arc::new(MemoryFileStore::new()),
        config.clone(),
    ));
    let resolver = Arc::new(VariantResolver::new(config));
    AppState::new(files, resolver)
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(health));

    Router::new()
        .merge(health_routes)
        .merge(depot_api::router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// Spawn the periodic variant sweep task
fn spawn_sweeper(config: DepotConfig) {
    tokio::spawn(async move {
        let ttl = Duration::from_secs(config.images.static_ttl_seconds);
        let mut interval = tokio::time::interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;

            let static_root = config.paths.static_root.clone();
            match tokio::task::spawn_blocking(move || depot_images::sweep(&static_root, ttl)).await {
                Ok(report) => {
                    if !report.removed.is_empty() || !report.failed.is_empty() {
                        info!(
                            removed = report.removed.len(),
                            failed = report.failed.len(),
                            "variant sweep finished"
                        );
                    }
                }
                Err(e) => warn!(error = %e, "variant sweep task failed"),
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Liveness endpoint
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
