use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use vibe_backend::core::config::{AppPaths, ConfigService};
use vibe_backend::core::logging;
use vibe_backend::server;
use vibe_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config_service = ConfigService::new(paths.clone());
    let config = config_service
        .load()
        .with_context(|| format!("Failed to load {}", config_service.config_path().display()))?;

    match serde_json::to_value(&config) {
        Ok(value) => tracing::info!(
            "Effective config: {}",
            config_service.redact_sensitive_values(&value)
        ),
        Err(err) => tracing::warn!("Failed to serialize config for logging: {}", err),
    }

    let bind_addr = config.bind_addr();
    let state = AppState::initialize(&paths, config)
        .await
        .context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
