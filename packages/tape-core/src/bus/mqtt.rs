//! MQTT transport for the sensor bus, built on `rumqttc`.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::{parse_position, BusError, BusResult, LedPublisher, SensorSample};
use crate::color::Rgb;
use crate::protocol_constants::{
    MQTT_KEEP_ALIVE_SECS, MQTT_RECONNECT_DELAY_MS, MQTT_REQUEST_CAPACITY,
};
use crate::state::Config;

/// Creates the MQTT client handle and its event pump.
///
/// Nothing touches the network until [`MqttEventPump::run`] starts polling.
pub fn connect(config: &Config) -> (MqttSensorBus, MqttEventPump) {
    let mut options = MqttOptions::new(
        config.mqtt_client_id.clone(),
        config.mqtt_host.clone(),
        config.mqtt_port,
    );
    options.set_keep_alive(Duration::from_secs(MQTT_KEEP_ALIVE_SECS));

    let (client, eventloop) = AsyncClient::new(options, MQTT_REQUEST_CAPACITY);

    let bus = MqttSensorBus {
        client: client.clone(),
        led_topic: config.led_topic.clone(),
    };
    let pump = MqttEventPump {
        client,
        eventloop,
        position_topic: config.position_topic.clone(),
        on_connect: None,
    };
    (bus, pump)
}

/// Publishing side of the MQTT connection.
#[derive(Clone)]
pub struct MqttSensorBus {
    client: AsyncClient,
    led_topic: String,
}

impl MqttSensorBus {
    /// Requests a clean disconnect from the broker.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            log::debug!("[MQTT] Disconnect request failed: {}", e);
        }
    }
}

#[async_trait]
impl LedPublisher for MqttSensorBus {
    async fn publish_led(&self, color: Rgb) -> BusResult<()> {
        let payload = serde_json::to_vec(&color)?;
        self.client
            .publish(self.led_topic.as_str(), QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }
}

/// Callback run on every CONNACK.
type ConnectHook = Box<dyn Fn() + Send + Sync>;

/// Drives the MQTT event loop and feeds position samples to the bridge.
pub struct MqttEventPump {
    client: AsyncClient,
    eventloop: EventLoop,
    position_topic: String,
    on_connect: Option<ConnectHook>,
}

impl MqttEventPump {
    /// Runs `hook` each time the broker accepts a (re)connection.
    pub fn on_connect(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Box::new(hook));
        self
    }

    /// Polls the broker until cancelled or the sample queue closes.
    ///
    /// Subscribes on every CONNACK so the subscription survives reconnects.
    /// When the sample queue is full the newest sample is dropped; the next
    /// reading supersedes it anyway.
    pub async fn run(mut self, samples: mpsc::Sender<SensorSample>, cancel: CancellationToken) {
        log::info!("[MQTT] Event pump started (topic: {})", self.position_topic);

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.eventloop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    log::info!("[MQTT] Connected, subscribing to {}", self.position_topic);
                    if let Err(e) = self.subscribe() {
                        log::error!("[MQTT] {}", e);
                    }
                    if let Some(hook) = &self.on_connect {
                        hook();
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic != self.position_topic {
                        log::trace!("[MQTT] Ignoring message on {}", publish.topic);
                        continue;
                    }
                    let position = match parse_position(&publish.payload) {
                        Ok(position) => position,
                        Err(e) => {
                            log::warn!("[MQTT] Dropping position sample: {}", e);
                            continue;
                        }
                    };
                    match samples.try_send(SensorSample { position }) {
                        Ok(()) => {}
                        Err(TrySendError::Full(sample)) => {
                            log::warn!(
                                "[MQTT] Sample queue full, dropping position {}",
                                sample.position
                            );
                        }
                        Err(TrySendError::Closed(_)) => {
                            log::info!("[MQTT] Sample queue closed, stopping pump");
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!(
                        "[MQTT] Connection error: {} (retrying in {}ms)",
                        e,
                        MQTT_RECONNECT_DELAY_MS
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_millis(MQTT_RECONNECT_DELAY_MS)) => {}
                    }
                }
            }
        }

        log::info!("[MQTT] Event pump stopped");
    }

    /// Queues a subscribe request without waiting on the event loop this task drives.
    fn subscribe(&self) -> BusResult<()> {
        self.client
            .try_subscribe(self.position_topic.as_str(), QoS::AtMostOnce)
            .map_err(|e| BusError::Subscribe(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pump_stops_on_cancellation() {
        let config = Config {
            // Nothing listens here; poll() fails and the pump sits in its retry delay.
            mqtt_host: "127.0.0.1".into(),
            mqtt_port: 1,
            ..Default::default()
        };
        let (_bus, pump) = connect(&config);
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(pump.run(tx, cancel.clone()));
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pump should stop after cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn connect_hook_runs_on_connack() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Minimal broker: read CONNECT, accept it, then hold the socket open.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = Config {
            mqtt_host: "127.0.0.1".into(),
            mqtt_port: port,
            ..Default::default()
        };
        let (_bus, pump) = connect(&config);
        let (hook_tx, mut hook_rx) = mpsc::unbounded_channel();
        let pump = pump.on_connect(move || {
            let _ = hook_tx.send(());
        });
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pump.run(tx, cancel.clone()));

        tokio::time::timeout(Duration::from_secs(5), hook_rx.recv())
            .await
            .expect("hook should run after CONNACK")
            .unwrap();

        cancel.cancel();
        handle.await.unwrap();
    }
}
