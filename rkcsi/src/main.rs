//! `rkcsi`: host-path CSI plugin daemon.
//!
//! Serves the identity, controller and node services on a Unix socket until
//! SIGINT or SIGTERM.

mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use libcsi::transport::server::CsiServer;
use libcsi::{HostPathDriver, SystemMounter, VolumeRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Args, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Failed to create directory {}", path.display()))
}

async fn shutdown_signal() {
    let mut sigterm =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.driver_config();
    ensure_dir(&config.volume_root).await?;
    ensure_dir(&config.data_dir).await?;

    let registry = Arc::new(VolumeRegistry::new());
    let driver = Arc::new(HostPathDriver::new(
        config,
        registry,
        Arc::new(SystemMounter::new()),
    ));
    info!(
        driver = %driver.config().driver_name,
        node_id = %driver.config().node_id,
        strict_publish = driver.config().strict_publish,
        "starting CSI plugin"
    );

    let server = CsiServer::bind(&args.endpoint, driver)
        .with_context(|| format!("Failed to bind {}", args.endpoint.display()))?;
    info!(
        endpoint = %server.local_path().display(),
        "serving identity, controller and node services"
    );
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("CSI plugin stopped");
    Ok(())
}
