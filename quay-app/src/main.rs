//! The quay relay hub binary: load settings, open the file store, spawn
//! the hub loop, and serve WebSocket clients until interrupted.

pub mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use quay_files::FileStore;
use quay_net::hub::{self, HubConfig};
use quay_net::Listener;
use settings::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Optional first argument overrides the config directory.
    let settings = match std::env::args().nth(1) {
        Some(dir) => Settings::load_from_dir(PathBuf::from(dir)),
        None => Settings::load(),
    };

    tracing::info!(
        listen_addr = %settings.listen_addr,
        storage_dir = %settings.storage_dir.display(),
        "quay starting"
    );

    let store = FileStore::new(settings.storage_dir.clone())?;
    let hub = hub::spawn(
        store,
        HubConfig {
            max_file_size: settings.max_file_size,
        },
    );

    let addr = settings
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address: {}", settings.listen_addr))?;
    let listener = Listener::bind(addr, hub).await?;

    tracing::info!(addr = %listener.local_addr(), "quay hub running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("shutdown requested");
    listener.close();

    Ok(())
}
