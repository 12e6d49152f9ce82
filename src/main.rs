//! Docmill Server
//!
//! A document conversion service: clients stage uploads, dispatch
//! asynchronous conversion jobs, poll for status, and download the results.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docmill_server::config::Config;
use docmill_server::convert::ExecutorRegistry;
use docmill_server::routes;
use docmill_server::state::AppState;
use docmill_server::usage::InMemoryUsageLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docmill_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Docmill Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload staging: {}", config.staging.upload_dir.display());
    tracing::info!("Output staging: {}", config.staging.output_dir.display());

    // Conversion executors are deployment-provided collaborators; the
    // dispatcher fails jobs for types nothing registered
    let registry = ExecutorRegistry::new();
    tracing::info!(
        supported = ?registry.supported_types(),
        "Executor registry initialized"
    );

    let limiter = Arc::new(InMemoryUsageLimiter::new(config.limits.clone()));
    let app_state = AppState::new(config.clone(), registry, limiter);

    app_state
        .staging()
        .ensure_dirs()
        .await
        .context("Failed to create staging directories")?;

    // Periodic staged-file expiry sweep; the handle detaches on drop
    let _sweeper = app_state.staging().clone().start_cleanup_task();

    let app = routes::app(app_state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Docmill Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
