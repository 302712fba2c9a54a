//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to services, the
//! display session hub, and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::bootstrap::BootstrappedServices;
use crate::runtime::TokioSpawner;
use crate::services::{SensorBridge, TimelineService};
use crate::state::Config;

pub mod http;
pub mod hub;
pub mod ws;

pub use hub::{BroadcastHub, Delivery, SessionGuard, SessionState};

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// `bind_host`/`bind_port` do not form a socket address.
    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    /// Display sessions.
    pub hub: Arc<BroadcastHub>,
    /// Timeline snapshot and refresh.
    pub timeline: Arc<TimelineService>,
    /// Sample pipeline (for the last-sent photo).
    pub bridge: Arc<SensorBridge>,
    /// Spawner for on-demand refreshes.
    pub spawner: TokioSpawner,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the API state from bootstrapped services.
    pub fn new(services: &BootstrappedServices) -> Self {
        Self {
            hub: Arc::clone(&services.hub),
            timeline: Arc::clone(&services.timeline),
            bridge: Arc::clone(&services.bridge),
            spawner: services.spawner.clone(),
            config: Arc::clone(&services.config),
        }
    }
}

/// Parses the configured bind address.
pub fn bind_address(config: &Config) -> Result<SocketAddr, ServerError> {
    format!("{}:{}", config.bind_host, config.bind_port)
        .parse()
        .map_err(|_| {
            ServerError::InvalidAddress(format!("{}:{}", config.bind_host, config.bind_port))
        })
}

/// Binds the configured address and serves the push channel and HTTP API.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let addr = bind_address(&state.config)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}

/// Serves on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<(), ServerError> {
    log::info!(
        "Push channel listening on ws://{}",
        listener.local_addr()?
    );
    let app = http::create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
