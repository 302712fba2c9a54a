//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
///
/// Field names match the YAML keys.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind the push channel to.
    /// Override: `TAPE_BIND_HOST`
    pub bind_host: String,

    /// Port to bind the push channel to.
    /// Override: `TAPE_BIND_PORT`
    pub bind_port: u16,

    /// Photo catalog API base address.
    /// Override: `TAPE_CATALOG_URL`
    pub catalog_url: String,

    /// Thumbnail variant used in display URLs.
    pub image_variant: String,

    /// Albums requested per timeline build.
    pub album_count: u32,

    /// Photos requested per album.
    pub photo_count: u32,

    /// Seconds between timeline rebuilds (0 = only at startup).
    /// Override: `TAPE_TIMELINE_REFRESH_INTERVAL`
    pub timeline_refresh_interval: u64,

    /// MQTT broker host.
    /// Override: `TAPE_MQTT_HOST`
    pub mqtt_host: String,

    /// MQTT broker port.
    /// Override: `TAPE_MQTT_PORT`
    pub mqtt_port: u16,

    /// MQTT client identifier.
    pub mqtt_client_id: String,

    /// Position sample topic.
    pub position_topic: String,

    /// LED command topic.
    pub led_topic: String,

    /// Position samples buffered between the MQTT pump and the bridge.
    pub sample_queue_capacity: usize,

    /// Messages buffered per display session.
    pub session_queue_capacity: usize,

    /// Extra attempts for display dispatch and LED publish.
    pub dispatch_retry_attempts: u32,

    /// Delay between those attempts (milliseconds).
    pub dispatch_retry_delay_ms: u64,

    /// Extra attempts for a failed startup timeline build.
    pub catalog_retry_attempts: u32,

    /// Delay between startup build attempts (milliseconds).
    pub catalog_retry_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = tape_core::Config::default();
        Self {
            bind_host: core.bind_host,
            bind_port: core.bind_port,
            catalog_url: core.catalog_url,
            image_variant: core.image_variant,
            album_count: core.album_count,
            photo_count: core.photo_count,
            timeline_refresh_interval: core.timeline_refresh_interval,
            mqtt_host: core.mqtt_host,
            mqtt_port: core.mqtt_port,
            mqtt_client_id: core.mqtt_client_id,
            position_topic: core.position_topic,
            led_topic: core.led_topic,
            sample_queue_capacity: core.sample_queue_capacity,
            session_queue_capacity: core.session_queue_capacity,
            dispatch_retry_attempts: core.dispatch_retry_attempts,
            dispatch_retry_delay_ms: core.dispatch_retry_delay_ms,
            catalog_retry_attempts: core.catalog_retry_attempts,
            catalog_retry_delay_ms: core.catalog_retry_delay_ms,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up through `var`.
    ///
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("TAPE_BIND_HOST") {
            self.bind_host = val;
        }

        if let Some(port) = var("TAPE_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }

        if let Some(val) = var("TAPE_CATALOG_URL") {
            self.catalog_url = val;
        }

        if let Some(interval) = var("TAPE_TIMELINE_REFRESH_INTERVAL").and_then(|v| v.parse().ok()) {
            self.timeline_refresh_interval = interval;
        }

        if let Some(val) = var("TAPE_MQTT_HOST") {
            self.mqtt_host = val;
        }

        if let Some(port) = var("TAPE_MQTT_PORT").and_then(|v| v.parse().ok()) {
            self.mqtt_port = port;
        }
    }

    /// Converts to tape-core's Config type.
    pub fn to_core_config(&self) -> tape_core::Config {
        tape_core::Config {
            bind_host: self.bind_host.clone(),
            bind_port: self.bind_port,
            catalog_url: self.catalog_url.clone(),
            album_count: self.album_count,
            photo_count: self.photo_count,
            image_variant: self.image_variant.clone(),
            timeline_refresh_interval: self.timeline_refresh_interval,
            mqtt_host: self.mqtt_host.clone(),
            mqtt_port: self.mqtt_port,
            mqtt_client_id: self.mqtt_client_id.clone(),
            position_topic: self.position_topic.clone(),
            led_topic: self.led_topic.clone(),
            sample_queue_capacity: self.sample_queue_capacity,
            session_queue_capacity: self.session_queue_capacity,
            dispatch_retry_attempts: self.dispatch_retry_attempts,
            dispatch_retry_delay_ms: self.dispatch_retry_delay_ms,
            catalog_retry_attempts: self.catalog_retry_attempts,
            catalog_retry_delay_ms: self.catalog_retry_delay_ms,
        }
    }
}
