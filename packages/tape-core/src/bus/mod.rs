//! Sensor bus: position samples in, LED color commands out.
//!
//! The bridge depends on [`LedPublisher`] rather than the MQTT client so
//! tests can record publishes. Inbound samples arrive as [`SensorSample`]s on
//! a bounded `tokio::sync::mpsc` queue fed by [`MqttEventPump`].

mod mqtt;

use async_trait::async_trait;
use thiserror::Error;

use crate::color::Rgb;

pub use mqtt::{connect, MqttEventPump, MqttSensorBus};

/// Errors that can occur on the sensor bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// Publishing a message failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Subscribing to a topic failed.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// Payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenient Result alias for sensor bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// A tape position reading, in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSample {
    pub position: i64,
}

/// Publishes ambient light commands.
#[async_trait]
pub trait LedPublisher: Send + Sync {
    /// Publishes `color` as a `{r, g, b}` JSON object.
    async fn publish_led(&self, color: Rgb) -> BusResult<()>;
}

/// Why a position payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionParseError {
    #[error("payload is not UTF-8")]
    NotUtf8,
    #[error("payload {0:?} is not a number")]
    NotANumber(String),
}

/// Decodes a position payload.
///
/// Accepts a decimal integer with optional surrounding whitespace. Decimal
/// fractions are truncated toward zero, since some firmware reports `12.0`.
pub fn parse_position(payload: &[u8]) -> Result<i64, PositionParseError> {
    let text = std::str::from_utf8(payload).map_err(|_| PositionParseError::NotUtf8)?;
    let text = text.trim();

    if let Ok(position) = text.parse::<i64>() {
        return Ok(position);
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() < i64::MAX as f64 => Ok(value.trunc() as i64),
        _ => Err(PositionParseError::NotANumber(text.to_string())),
    }
}
