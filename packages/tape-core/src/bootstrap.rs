//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the one place where the catalog
//! client, timeline, display hub, sensor bus, and sensor bridge are created
//! and connected.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::BroadcastHub;
use crate::bus::{self, LedPublisher, MqttEventPump, MqttSensorBus, SensorSample};
use crate::catalog::{CatalogClient, HttpCatalogClient, ImageUrlBuilder};
use crate::error::{RelayError, RelayResult};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::{RetryPolicy, SensorBridge, TimelineService};
use crate::state::Config;
use crate::timeline::TimelineStore;

/// Parts that are consumed when background tasks start.
struct PendingTasks {
    pump: MqttEventPump,
    samples: mpsc::Receiver<SensorSample>,
    samples_tx: mpsc::Sender<SensorSample>,
}

/// Container for all bootstrapped services.
pub struct BootstrappedServices {
    pub config: Arc<Config>,
    /// Display session registry and fan-out.
    pub hub: Arc<BroadcastHub>,
    /// Timeline snapshot and refresh.
    pub timeline: Arc<TimelineService>,
    /// Sample → display/LED pipeline.
    pub bridge: Arc<SensorBridge>,
    /// MQTT publishing handle.
    pub bus: MqttSensorBus,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    pending: Mutex<Option<PendingTasks>>,
}

impl BootstrappedServices {
    /// Starts the MQTT pump, the sample loop, the initial timeline build, and
    /// the periodic refresh (when configured).
    ///
    /// Calling this more than once has no effect.
    pub fn start_background_tasks(&self) {
        let Some(PendingTasks {
            pump,
            samples,
            samples_tx,
        }) = self.pending.lock().take()
        else {
            log::warn!("[Bootstrap] Background tasks already started");
            return;
        };

        let bridge = Arc::clone(&self.bridge);
        let cancel = self.cancel_token.clone();
        self.spawner.spawn(async move {
            bridge.run(samples, cancel).await;
        });

        // Reload the timeline whenever the sensor (re)connects.
        let timeline = Arc::clone(&self.timeline);
        let spawner = self.spawner.clone();
        let pump = pump.on_connect(move || {
            if let Err(e) = timeline.spawn_refresh(&spawner) {
                log::debug!("[Bootstrap] Reconnect refresh skipped: {}", e);
            }
        });
        self.spawner
            .spawn(pump.run(samples_tx, self.cancel_token.clone()));

        self.timeline
            .spawn_initial_refresh(&self.spawner, RetryPolicy::catalog_from_config(&self.config));

        if let Some(period) = self.config.refresh_period() {
            self.spawner.spawn(
                Arc::clone(&self.timeline).run_periodic(period, self.cancel_token.clone()),
            );
        }
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to all background tasks
        self.cancel_token.cancel();

        let closed = self.hub.close_all();
        log::info!("[Bootstrap] Closed {} display session(s)", closed);

        self.bus.disconnect().await;

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for catalog requests.
///
/// No request timeout is set: a hung catalog only delays a timeline refresh.
fn create_http_client() -> RelayResult<Client> {
    Client::builder()
        .build()
        .map_err(|e| RelayError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all relay services with their dependencies.
///
/// Services are created in dependency order:
///
/// 1. Shared infrastructure (HTTP client, cancellation token, spawner)
/// 2. Catalog client and timeline service
/// 3. Display hub
/// 4. Sensor bus client (not yet connected)
/// 5. Sensor bridge (depends on timeline store, hub, bus)
///
/// Must be called from within a Tokio runtime.
pub fn bootstrap_services(config: Config) -> RelayResult<BootstrappedServices> {
    config.validate().map_err(RelayError::Configuration)?;
    let config = Arc::new(config);

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();
    let http_client = create_http_client()?;

    let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(
        http_client,
        config.catalog_base(),
    ));
    let store = Arc::new(TimelineStore::new());
    let timeline = Arc::new(TimelineService::new(
        catalog,
        Arc::clone(&store),
        config.album_count,
        config.photo_count,
    ));

    let hub = Arc::new(BroadcastHub::new(config.session_queue_capacity));

    let (bus, pump) = bus::connect(&config);
    log::info!(
        "[Bootstrap] Sensor bus: mqtt://{}:{} (position: {}, led: {})",
        config.mqtt_host,
        config.mqtt_port,
        config.position_topic,
        config.led_topic
    );

    let bridge = Arc::new(SensorBridge::new(
        store,
        Arc::clone(&hub),
        Arc::new(bus.clone()) as Arc<dyn LedPublisher>,
        ImageUrlBuilder::new(config.catalog_base(), config.image_variant.clone()),
        RetryPolicy::from_config(&config),
    ));

    let (samples_tx, samples) = mpsc::channel(config.sample_queue_capacity);

    Ok(BootstrappedServices {
        config,
        hub,
        timeline,
        bridge,
        bus,
        spawner,
        cancel_token,
        pending: Mutex::new(Some(PendingTasks {
            pump,
            samples,
            samples_tx,
        })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = Config {
            sample_queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            bootstrap_services(config),
            Err(RelayError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_wires_shared_state() {
        let services = bootstrap_services(Config::default()).unwrap();

        assert!(services.timeline.snapshot().is_empty());
        assert_eq!(services.hub.session_count(), 0);
        assert_eq!(services.bridge.last_sent_hash(), None);
        assert!(services.pending.lock().is_some());
    }

    #[tokio::test]
    async fn startup_build_survives_catalog_outage() {
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::json;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let album_calls = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&album_calls);
        let router = Router::new()
            .route(
                "/api/v1/albums",
                get(move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "starting"})))
                        } else {
                            (
                                StatusCode::OK,
                                Json(json!([{"UID": "a1", "Description": "TAPE|1|trip|Rome|red|0"}])),
                            )
                        }
                    }
                }),
            )
            .route(
                "/api/v1/photos",
                get(|| async { Json(json!([{"Hash": "h0"}, {"Hash": "h1"}])) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let config = Config {
            catalog_url: format!("http://{}/api/v1", addr),
            mqtt_host: "127.0.0.1".into(),
            mqtt_port: 1,
            catalog_retry_delay_ms: 100,
            ..Default::default()
        };
        let services = bootstrap_services(config).unwrap();
        services.start_background_tasks();

        for _ in 0..100 {
            if !services.timeline.snapshot().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert!(album_calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(services.timeline.snapshot().len(), 1);
        services.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_cancels_background_tasks() {
        let config = Config {
            catalog_url: "http://127.0.0.1:1/api/v1".into(),
            mqtt_host: "127.0.0.1".into(),
            mqtt_port: 1,
            ..Default::default()
        };
        let services = bootstrap_services(config).unwrap();
        services.start_background_tasks();
        assert!(services.pending.lock().is_none());

        services.shutdown().await;
        assert!(services.cancel_token.is_cancelled());
    }
}
