// src/main.rs
mod config;
mod models;
mod routes;
mod services;
mod state;

use anyhow::Context;
use axum::serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::routes::app;
use crate::services::store::PresenceStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxgrid=info".into()),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("failed to load config")?;

    let app_state = Arc::new(AppState {
        store: PresenceStore::new(config.channel_capacity),
        grid: config.grid,
    });

    let router = app(app_state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        bind = %config.bind_addr,
        width = config.grid.bounds.width,
        height = config.grid.bounds.height,
        "boxgrid listening"
    );
    serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("boxgrid stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
