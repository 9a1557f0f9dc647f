//! Race Dash - Main Entry Point

use anyhow::Context;
use dashboard::{init_logging, run, DashboardConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = DashboardConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    init_logging(&config);

    info!("=== Race Dash v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", config.storage.data_dir.display());

    run(config).await?;

    Ok(())
}
