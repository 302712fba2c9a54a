//! Sensor bridge: position samples in, photos and LED colors out.
//!
//! For every sample the bridge resolves the photo under the tape, and when it
//! differs from the last photo sent it:
//!
//! 1. pushes a [`DisplayMessage`] to every open display session
//! 2. publishes the album's color on the LED topic
//!
//! Repeated samples over the same photo produce nothing. Samples that land
//! in a gap produce nothing and leave the last-sent photo unchanged.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::retry::{with_retry, RetryPolicy, Transient};
use crate::api::hub::BroadcastHub;
use crate::bus::{LedPublisher, SensorSample};
use crate::catalog::ImageUrlBuilder;
use crate::color::LedColor;
use crate::display::DisplayMessage;
use crate::error::ErrorCode;
use crate::timeline::TimelineStore;

/// What happened to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// No photo at this position.
    NoMatch,
    /// Same photo as the last dispatch; suppressed.
    Duplicate,
    /// New photo sent to displays.
    Dispatched {
        /// Sessions that accepted the display message.
        delivered: usize,
        /// Whether the LED command reached the bus.
        led_published: bool,
    },
}

/// Reasons a display dispatch attempt did not reach anyone.
#[derive(Debug, Error)]
enum DispatchError {
    #[error("no open display session ({connecting} still connecting)")]
    AwaitingSessions { connecting: usize },
    #[error("display message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Transient for DispatchError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::AwaitingSessions { .. })
    }
}

/// Turns position samples into display dispatches and LED commands.
pub struct SensorBridge {
    timeline: Arc<TimelineStore>,
    hub: Arc<BroadcastHub>,
    led: Arc<dyn LedPublisher>,
    urls: ImageUrlBuilder,
    retry: RetryPolicy,
    /// Content hash of the most recently dispatched photo.
    last_sent_hash: Mutex<Option<String>>,
}

impl SensorBridge {
    pub fn new(
        timeline: Arc<TimelineStore>,
        hub: Arc<BroadcastHub>,
        led: Arc<dyn LedPublisher>,
        urls: ImageUrlBuilder,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            timeline,
            hub,
            led,
            urls,
            retry,
            last_sent_hash: Mutex::new(None),
        }
    }

    /// Content hash of the photo currently on display, if any.
    pub fn last_sent_hash(&self) -> Option<String> {
        self.last_sent_hash.lock().clone()
    }

    /// Consumes samples until the queue closes or `cancel` fires.
    pub async fn run(&self, mut samples: mpsc::Receiver<SensorSample>, cancel: CancellationToken) {
        log::info!("[Bridge] Sample loop started");
        loop {
            let sample = tokio::select! {
                _ = cancel.cancelled() => break,
                sample = samples.recv() => match sample {
                    Some(sample) => sample,
                    None => break,
                },
            };
            self.handle_sample(sample.position).await;
        }
        log::info!("[Bridge] Sample loop stopped");
    }

    /// Processes one position sample.
    pub async fn handle_sample(&self, position: i64) -> SampleOutcome {
        log::debug!("[Bridge] Tape position: {} cm", position);

        let timeline = self.timeline.snapshot();
        let Some(hit) = timeline.resolve(position) else {
            log::debug!("[Bridge] No photo at position {}", position);
            return SampleOutcome::NoMatch;
        };

        {
            let mut last = self.last_sent_hash.lock();
            if last.as_deref() == Some(hit.photo.content_hash.as_str()) {
                return SampleOutcome::Duplicate;
            }
            *last = Some(hit.photo.content_hash.clone());
        }

        let message = DisplayMessage::image(
            self.urls.display_url(&hit.photo.content_hash),
            hit.album.title.clone(),
            hit.album.color_tag.clone(),
            position,
        );
        let color = LedColor::from_tag(&hit.album.color_tag);
        drop(timeline);

        let delivered = match self.dispatch(&message).await {
            Ok(delivered) => delivered,
            Err(e) => {
                log::warn!("[Bridge] Display dispatch abandoned: {}", e);
                0
            }
        };
        log::info!(
            "[Bridge] Sent photo from album {:?} at {} cm -> {} ({} display(s))",
            message.album_title,
            position,
            message.url,
            delivered
        );

        let led = &self.led;
        let rgb = color.rgb();
        let led_published = match with_retry("LED publish", self.retry, move || led.publish_led(rgb)).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[Bridge] LED publish abandoned ({}, {}): {}", color, e.code(), e);
                false
            }
        };

        SampleOutcome::Dispatched {
            delivered,
            led_published,
        }
    }

    /// Hands the message to the hub and returns how many displays got it.
    ///
    /// The message is broadcast once. If nobody is open yet but a session is
    /// still connecting, waits for it to open; the hub replays the message
    /// to it on open.
    async fn dispatch(&self, message: &DisplayMessage) -> Result<usize, DispatchError> {
        let delivery = self.hub.dispatch_display(message)?;
        if delivery.delivered > 0 {
            return Ok(delivery.delivered);
        }

        let hub = &self.hub;
        with_retry("display dispatch", self.retry, move || {
            std::future::ready(Self::replayed_count(hub))
        })
        .await
    }

    fn replayed_count(hub: &BroadcastHub) -> Result<usize, DispatchError> {
        let open = hub.open_count();
        let connecting = hub.connecting_count();
        if open == 0 && connecting > 0 {
            return Err(DispatchError::AwaitingSessions { connecting });
        }
        Ok(open)
    }
}
