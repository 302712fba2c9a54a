//! Display session registry and fan-out.
//!
//! - `BroadcastHub`: owns every live display session and delivers messages
//! - `SessionGuard`: RAII handle that unregisters its session on drop
//!
//! Each session has a bounded outbound queue drained by its own WebSocket
//! task. The hub only ever `try_send`s into those queues, so a slow or
//! stalled client never holds up a broadcast or the sensor pipeline.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::display::DisplayMessage;
use crate::protocol_constants::CONNECTION_ID_PREFIX;

/// Lifecycle of a display session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Registered, WebSocket upgrade not yet complete.
    Connecting,
    /// Receiving broadcasts.
    Open,
    /// Disconnected or failed; awaiting removal.
    Closed,
}

/// One connected display client.
struct Session {
    state: SessionState,
    outbound: mpsc::Sender<Utf8Bytes>,
}

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Open sessions that accepted the message.
    pub delivered: usize,
    /// Sessions skipped because they were not open or their queue was full.
    pub skipped: usize,
    /// Sessions found dead during this broadcast and removed.
    pub dropped: usize,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delivered={} skipped={} dropped={}",
            self.delivered, self.skipped, self.dropped
        )
    }
}

/// Tracks display sessions and fans messages out to them.
pub struct BroadcastHub {
    /// Live sessions: connection_id -> Session
    sessions: DashMap<String, Session>,
    next_id: AtomicU64,
    queue_capacity: usize,
    /// Parent of every session's cancellation token.
    /// Replaced after close_all() so new sessions can still connect.
    global_cancel: RwLock<CancellationToken>,
    /// Last display message, sent to sessions as they open.
    last_display: RwLock<Option<Utf8Bytes>>,
}

impl BroadcastHub {
    /// Creates a hub whose sessions buffer up to `queue_capacity` messages.
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity` is 0.
    pub fn new(queue_capacity: usize) -> Self {
        assert!(queue_capacity > 0, "session queue capacity must be >= 1");
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_capacity,
            global_cancel: RwLock::new(CancellationToken::new()),
            last_display: RwLock::new(None),
        }
    }

    /// Registers a new session in the `Connecting` state.
    ///
    /// Returns the guard that owns the registration and the receiver the
    /// connection task drains into its socket.
    pub fn register(self: &Arc<Self>) -> (SessionGuard, mpsc::Receiver<Utf8Bytes>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn_id = format!("{}-{}", CONNECTION_ID_PREFIX, id);
        let cancel_token = self.global_cancel.read().child_token();
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        self.sessions.insert(
            conn_id.clone(),
            Session {
                state: SessionState::Connecting,
                outbound: tx,
            },
        );
        log::info!(
            "[Hub] Session registered: {} (total: {})",
            conn_id,
            self.sessions.len()
        );

        let guard = SessionGuard {
            id: conn_id,
            hub: Arc::clone(self),
            cancel_token,
        };
        (guard, rx)
    }

    /// Moves a session from `Connecting` to `Open` and replays the current photo.
    fn open(&self, id: &str) -> bool {
        let Some(mut session) = self.sessions.get_mut(id) else {
            return false;
        };
        if session.state != SessionState::Connecting {
            return false;
        }
        session.state = SessionState::Open;

        if let Some(text) = self.last_display.read().clone() {
            if session.outbound.try_send(text).is_err() {
                log::debug!("[Hub] Could not replay current photo to {}", id);
            }
        }
        log::info!("[Hub] Session open: {}", id);
        true
    }

    /// Marks a session closed so broadcasts skip it until it is removed.
    fn close(&self, id: &str) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.state = SessionState::Closed;
        }
    }

    fn unregister(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            log::info!(
                "[Hub] Session unregistered: {} (remaining: {})",
                id,
                self.sessions.len()
            );
        }
    }

    /// Returns the state of a session, if it is still registered.
    pub fn session_state(&self, id: &str) -> Option<SessionState> {
        self.sessions.get(id).map(|s| s.state)
    }

    /// Number of registered sessions in any state.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.count_in(SessionState::Open)
    }

    #[must_use]
    pub fn connecting_count(&self) -> usize {
        self.count_in(SessionState::Connecting)
    }

    fn count_in(&self, state: SessionState) -> usize {
        self.sessions.iter().filter(|s| s.state == state).count()
    }

    /// Delivers the same text frame to every open session.
    ///
    /// Sessions with a full queue are skipped for this message. Sessions whose
    /// queue is closed (their socket task has ended) are removed.
    pub fn broadcast_text(&self, text: Utf8Bytes) -> Delivery {
        let mut delivery = Delivery::default();
        let mut dead = Vec::new();

        for mut entry in self.sessions.iter_mut() {
            if entry.state != SessionState::Open {
                delivery.skipped += 1;
                continue;
            }
            match entry.outbound.try_send(text.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::debug!("[Hub] Session {} not ready, skipping", entry.key());
                    delivery.skipped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    entry.state = SessionState::Closed;
                    dead.push(entry.key().clone());
                }
            }
        }

        for id in dead {
            log::warn!("[Hub] Session {} failed during broadcast, removing", id);
            self.unregister(&id);
            delivery.dropped += 1;
        }
        delivery
    }

    /// Serializes `payload` once and broadcasts it.
    pub fn broadcast_json<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<Delivery, serde_json::Error> {
        let text = serde_json::to_string(payload)?;
        Ok(self.broadcast_text(text.into()))
    }

    /// Broadcasts a display message and remembers it for sessions that open later.
    pub fn dispatch_display(&self, message: &DisplayMessage) -> Result<Delivery, serde_json::Error> {
        let text: Utf8Bytes = serde_json::to_string(message)?.into();
        *self.last_display.write() = Some(text.clone());
        tracing::debug!(?message, "display_dispatch");
        Ok(self.broadcast_text(text))
    }

    /// Handles a text frame sent by a client.
    ///
    /// Valid JSON is rebroadcast to every open session, the sender included.
    /// Anything else is logged and dropped; the connection stays up.
    pub fn on_client_message(&self, conn_id: &str, raw: &str) -> Option<Delivery> {
        let parsed: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("[Hub] Invalid JSON from {}: {}", conn_id, e);
                return None;
            }
        };
        log::debug!("[Hub] Relaying message from {}: {}", conn_id, parsed);

        match self.broadcast_json(&parsed) {
            Ok(delivery) => Some(delivery),
            Err(e) => {
                log::warn!("[Hub] Failed to re-encode message from {}: {}", conn_id, e);
                None
            }
        }
    }

    /// Signals every session to close.
    ///
    /// Returns the number of sessions that were signaled.
    pub fn close_all(&self) -> usize {
        let count = self.sessions.len();
        if count > 0 {
            log::info!("[Hub] Force-closing {} session(s)", count);
            let mut guard = self.global_cancel.write();
            guard.cancel();
            *guard = CancellationToken::new();
        }
        count
    }
}

/// RAII guard that unregisters a session when dropped.
pub struct SessionGuard {
    id: String,
    hub: Arc<BroadcastHub>,
    cancel_token: CancellationToken,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Token cancelled when the hub force-closes sessions.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Transitions `Connecting -> Open`. Returns `false` if the session was
    /// not connecting (already open, closed, or removed).
    pub fn mark_open(&self) -> bool {
        self.hub.open(&self.id)
    }

    /// Transitions to `Closed`.
    pub fn mark_closed(&self) {
        self.hub.close(&self.id);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.hub.unregister(&self.id);
    }
}
