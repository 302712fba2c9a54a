//! Tape Relay - headless bridge between a tape reel sensor and photo displays.
//!
//! Position samples arrive over MQTT, are resolved against a timeline built
//! from the photo catalog, and the matching photo is pushed to every
//! connected display while the LED strip is recolored to match the album.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tape_core::{bootstrap_services, start_server, AppState};
use tokio::signal;

use crate::config::ServerConfig;

/// Tape Relay - maps reel positions to photos on connected displays.
#[derive(Parser, Debug)]
#[command(name = "tape-relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "TAPE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Photo catalog API base address (overrides config file).
    #[arg(long, value_name = "URL")]
    catalog_url: Option<String>,

    /// MQTT broker host (overrides config file).
    #[arg(long, value_name = "HOST")]
    mqtt_host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Tape Relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(url) = args.catalog_url {
        config.catalog_url = url;
    }
    if let Some(host) = args.mqtt_host {
        config.mqtt_host = host;
    }

    log::info!(
        "Configuration: bind={}:{}, catalog={}, broker={}:{}",
        config.bind_host,
        config.bind_port,
        config.catalog_url,
        config.mqtt_host,
        config.mqtt_port
    );

    let services =
        bootstrap_services(config.to_core_config()).context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    services.start_background_tasks();

    log::info!("Background tasks started");

    let app_state = AppState::new(&services);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown().await;

    // Sessions are closed by now; the listener has nothing left to serve
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
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
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
