pub mod auth;
pub mod background;
pub mod db;
pub mod routes;
pub mod state;
pub mod stores;

use std::time::Duration;

use axum::Router;
use pc_common::config::ConsoleConfig;
use pc_common::error::{AppError, AppResult};
use tracing::info;

use crate::state::AppState;
use crate::stores::setting::SettingsStore;

/// Connects storage and builds the state shared by routes and background work.
pub async fn state_from_config(config: &ConsoleConfig) -> AppResult<AppState> {
    let pool = db::connect_and_migrate(&config.database_url).await?;
    let settings =
        SettingsStore::new_with_ttl(pool.clone(), Duration::from_secs(config.settings_ttl_secs));

    let git_sha = std::env::var("GIT_SHA").ok();
    let boot_id = std::env::var("PC_BOOT_ID")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| format!("pc-{}", std::process::id()));

    Ok(AppState::new(
        boot_id,
        git_sha,
        config.admin_password.clone(),
        pool,
        settings,
    ))
}

pub async fn app_from_config(config: &ConsoleConfig) -> AppResult<Router> {
    let state = state_from_config(config).await?;
    background::spawn(
        state.clone(),
        Duration::from_secs(config.promotion_interval_secs.max(1)),
    );
    Ok(routes::build_router(state))
}

/// Serves until ctrl-c.
pub async fn serve(config: ConsoleConfig) -> AppResult<()> {
    let app = app_from_config(&config).await?;
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("bind {} failed: {e}", config.bind_addr)))?;
    info!(bind_addr = %config.bind_addr, "partner console listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::External(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
