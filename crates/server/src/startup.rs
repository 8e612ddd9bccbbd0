use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, ServerState};
use service::{
    storage::StoreOptions,
    users::{UserService, UserStore},
};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_from_env();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load config.toml when present, else env vars with sensible fallbacks
pub fn load_config() -> Result<AppConfig, StartupError> {
    AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    let addr = cfg.server.bind_addr();
    addr.parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bad bind address {addr}: {e}")))
}

/// Open the user store and assemble the router for the given config.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    common::env::ensure_env(&cfg.storage.static_dir, Path::new(&cfg.storage.data_file)).await?;

    let options = StoreOptions { corrupt_alert_threshold: cfg.storage.corrupt_alert_threshold };
    let store = UserStore::new(&cfg.storage.data_file, options).await?;
    if let Some(secs) = cfg.storage.autocompaction_interval_secs {
        store.documents().spawn_autocompaction(Duration::from_secs(secs));
        info!(every_secs = secs, "autocompaction enabled");
    }

    let state = ServerState { users: Arc::new(UserService::new(store)) };
    Ok(routes::build_router(state, &cfg.storage.static_dir, build_cors()))
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = load_config()?;
    let app = build_app(&cfg).await?;

    // Bind and serve
    let addr = bind_addr(&cfg)?;
    info!(%addr, data_file = %cfg.storage.data_file, "starting users api");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
