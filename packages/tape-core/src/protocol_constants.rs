//! Fixed protocol constants shared by the relay components.
//!
//! Tunable values live in [`Config`](crate::state::Config); the constants
//! here describe wire formats that display clients and sensor firmware
//! depend on.

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Service name reported by the health endpoint.
pub const SERVICE_ID: &str = "tape-relay";

// ─────────────────────────────────────────────────────────────────────────────
// Catalog Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix marking an album description as a tape timeline descriptor.
pub const TAPE_DESCRIPTOR_PREFIX: &str = "TAPE|";

/// Separator between descriptor fields.
pub const TAPE_DESCRIPTOR_SEPARATOR: char = '|';

/// Minimum number of fields in `TAPE|<tapeId>|<category>|<title>|<colorTag>|<startIndex>`.
pub const TAPE_DESCRIPTOR_FIELDS: usize = 6;

// ─────────────────────────────────────────────────────────────────────────────
// Sensor Bus
// ─────────────────────────────────────────────────────────────────────────────

/// Topic carrying tape position samples (decimal centimeters).
pub const DEFAULT_POSITION_TOPIC: &str = "tape/position";

/// Topic receiving `{r, g, b}` ambient light commands.
pub const DEFAULT_LED_TOPIC: &str = "tape/led";

/// MQTT keep-alive interval (seconds).
pub const MQTT_KEEP_ALIVE_SECS: u64 = 30;

/// Capacity of the rumqttc request queue between client handles and the event loop.
pub const MQTT_REQUEST_CAPACITY: usize = 16;

/// Pause before polling the MQTT event loop again after a connection error.
pub const MQTT_RECONNECT_DELAY_MS: u64 = 2000;

// ─────────────────────────────────────────────────────────────────────────────
// Push Channel
// ─────────────────────────────────────────────────────────────────────────────

/// `type` tag of the canonical outbound display message.
pub const DISPLAY_MESSAGE_TYPE: &str = "image";

/// Prefix of generated connection identifiers (`ws-1`, `ws-2`, ...).
pub const CONNECTION_ID_PREFIX: &str = "ws";
