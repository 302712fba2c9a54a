//! Relay configuration.
//!
//! [`Config`] is loaded once at startup by the binary and shared read-only
//! with every component. All fields have working defaults for a relay running
//! next to the catalog and the MQTT broker on a home network.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{DEFAULT_LED_TOPIC, DEFAULT_POSITION_TOPIC};

/// Configuration for the tape relay.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    // Server
    /// Interface the push channel and HTTP API bind to.
    pub bind_host: String,

    /// Port the push channel and HTTP API bind to.
    pub bind_port: u16,

    // Catalog
    /// Base address of the photo catalog API, including its version path.
    pub catalog_url: String,

    /// Maximum number of albums requested per timeline build.
    pub album_count: u32,

    /// Maximum number of photos requested per album.
    pub photo_count: u32,

    /// Rendering variant used when building display URLs.
    pub image_variant: String,

    /// Interval between background timeline rebuilds (seconds, 0 = startup only).
    pub timeline_refresh_interval: u64,

    // Sensor bus
    /// MQTT broker host.
    pub mqtt_host: String,

    /// MQTT broker port.
    pub mqtt_port: u16,

    /// Client identifier presented to the broker.
    pub mqtt_client_id: String,

    /// Topic carrying position samples.
    pub position_topic: String,

    /// Topic receiving LED color commands.
    pub led_topic: String,

    // Queues
    /// Capacity of the queue between the MQTT pump and the sensor bridge.
    pub sample_queue_capacity: usize,

    /// Capacity of each display session's outbound queue.
    pub session_queue_capacity: usize,

    // Retry
    /// Extra attempts for display dispatch and LED publish.
    pub dispatch_retry_attempts: u32,

    /// Fixed delay between those attempts (milliseconds).
    pub dispatch_retry_delay_ms: u64,

    /// Extra attempts for a startup timeline build that fails.
    pub catalog_retry_attempts: u32,

    /// Fixed delay between startup build attempts (milliseconds).
    pub catalog_retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8080,
            catalog_url: "http://127.0.0.1:2342/api/v1".to_string(),
            album_count: 100,
            photo_count: 200,
            image_variant: "fit_1920".to_string(),
            timeline_refresh_interval: 0,
            mqtt_host: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "tape-relay".to_string(),
            position_topic: DEFAULT_POSITION_TOPIC.to_string(),
            led_topic: DEFAULT_LED_TOPIC.to_string(),
            sample_queue_capacity: 64,
            session_queue_capacity: 32,
            dispatch_retry_attempts: 3,
            dispatch_retry_delay_ms: 500,
            catalog_retry_attempts: 10,
            catalog_retry_delay_ms: 3000,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.catalog_url.trim().is_empty() {
            return Err("catalog_url must not be empty".to_string());
        }
        if self.sample_queue_capacity == 0 {
            return Err(
                "sample_queue_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            );
        }
        if self.session_queue_capacity == 0 {
            return Err(
                "session_queue_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            );
        }
        if self.position_topic.is_empty() || self.led_topic.is_empty() {
            return Err("MQTT topics must not be empty".to_string());
        }
        Ok(())
    }

    /// Catalog base address without a trailing slash.
    pub fn catalog_base(&self) -> &str {
        self.catalog_url.trim_end_matches('/')
    }

    /// Background refresh period, if periodic refresh is enabled.
    pub fn refresh_period(&self) -> Option<Duration> {
        (self.timeline_refresh_interval > 0)
            .then(|| Duration::from_secs(self.timeline_refresh_interval))
    }

    /// Fixed delay between retry attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_retry_delay_ms)
    }

    /// Fixed delay between startup timeline build attempts.
    pub fn catalog_retry_delay(&self) -> Duration {
        Duration::from_millis(self.catalog_retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let config = Config {
            session_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn catalog_base_strips_trailing_slash() {
        let config = Config {
            catalog_url: "http://photos.local:2342/api/v1/".into(),
            ..Default::default()
        };
        assert_eq!(config.catalog_base(), "http://photos.local:2342/api/v1");
    }

    #[test]
    fn refresh_period_disabled_at_zero() {
        assert_eq!(Config::default().refresh_period(), None);
        let config = Config {
            timeline_refresh_interval: 60,
            ..Default::default()
        };
        assert_eq!(config.refresh_period(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"bind_port": 9000}"#).unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.position_topic, "tape/position");
    }
}
