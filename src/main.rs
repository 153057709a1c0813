//! Image Tools Server
//!
//! Converts, compresses, resizes and wraps images into PDFs, handing back a
//! short-lived download link for each result.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_tools_server::{router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "image_tools_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    tracing::info!("Starting Image Tools Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage directory: {}", config.storage.dir.display());
    match &config.server.public_url {
        Some(url) => tracing::info!("Public URL: {}", url),
        None if config.binds_wildcard() => tracing::warn!(
            host = %config.server.host,
            "PUBLIC_URL not set and HOST is a wildcard address; requests without a Host header get localhost download links"
        ),
        None => tracing::info!("Public URL not set, download links follow the Host header"),
    }

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid HOST: {}", config.server.host))?;
    let addr = SocketAddr::from((host, config.server.port));

    // Create application state
    let app_state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;

    let tasks = app_state.start_background_tasks();

    let app = router(app_state);

    // Start server with graceful shutdown
    tracing::info!("Image Tools Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    for task in tasks {
        task.abort();
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM so in-flight transforms can finish
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let source = tokio::select! {
        _ = interrupt => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };
    tracing::info!(signal = source, "Draining requests before shutdown");
}
