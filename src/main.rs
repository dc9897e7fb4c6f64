use anyhow::Context;
use pharmaconnect::api::{self, app_state::AppState};
use pharmaconnect::config::loader::ConfigLoader;
use pharmaconnect::observability::init_tracing;
use pharmaconnect::storage::StorageFactory;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config).context("invalid configuration")?;

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_tracing(&config.logging)?;
    info!(
        environment = %config.environment,
        storage = %config.database.backend,
        "Starting {}...",
        config.app_name
    );

    let tables = StorageFactory::create(&config.database).await?;
    info!("Storage initialized");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let poll_interval = config.handoff.poll_interval_secs;

    let app_state = AppState::from_config(config, tables)?;
    info!("Application state created");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = if poll_interval > 0 {
        info!(poll_interval, "Starting handoff worker");
        Some(
            app_state
                .handoff
                .clone()
                .spawn_worker(Duration::from_secs(poll_interval), shutdown_rx),
        )
    } else {
        None
    };

    let router = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(worker) = worker {
        worker.await?;
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
