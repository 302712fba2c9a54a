//! Tape Core - the tape position relay.
//!
//! A sensor reports how far a tape reel has been pulled (in centimeters).
//! Photo albums from a catalog are laid out along that tape; this crate maps
//! each reported position to the photo under it, pushes that photo to every
//! connected display, and sends the album's color back to the sensor's LED.
//!
//! # Architecture
//!
//! - [`catalog`]: HTTP client for the photo catalog
//! - [`timeline`]: album timeline, position resolution, snapshot store
//! - [`bus`]: MQTT sensor bus (position samples in, LED colors out)
//! - [`services`]: sensor bridge and timeline refresh
//! - [`api`]: display session hub, WebSocket push channel, HTTP routes
//! - [`bootstrap`]: composition root
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`CatalogClient`](catalog::CatalogClient): album/photo metadata source
//! - [`LedPublisher`](bus::LedPublisher): LED color sink
//! - [`TaskSpawner`](runtime::TaskSpawner): background task spawning

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod bus;
pub mod catalog;
pub mod color;
pub mod display;
pub mod error;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod timeline;

// Re-export commonly used types at the crate root
pub use color::{LedColor, Rgb};
pub use display::DisplayMessage;
pub use error::{BusResult, CatalogResult, ErrorCode, RelayError, RelayResult};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;

// Re-export domain types
pub use timeline::{Album, Photo, Resolved, Timeline, TimelineStore};

// Re-export service types
pub use services::{SampleOutcome, SensorBridge, TimelineService};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, BroadcastHub, ServerError};
