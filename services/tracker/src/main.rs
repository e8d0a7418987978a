use anyhow::Context as _;
use sea_orm::Database;
use tracing::info;

use barq_core::config::Config as _;
use barq_core::tracing::init_tracing;
use barq_tracker::config::TrackerConfig;
use barq_tracker::router::build_router;
use barq_tracker::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = TrackerConfig::try_from_env().context("load tracker config")?;
    info!(config = ?config, "starting tracker service");

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;

    let state = AppState::from_config(db, &config)?;
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.tracker_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("tracker service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
