//! Domain services.
//!
//! - [`SensorBridge`]: resolves samples, dispatches photos and LED colors
//! - [`TimelineService`]: rebuilds the timeline from the catalog
//! - [`retry`]: bounded fixed-delay retry shared by both

pub mod retry;
pub mod sensor_bridge;
pub mod timeline_service;

pub use retry::{with_retry, RetryPolicy, Transient};
pub use sensor_bridge::{SampleOutcome, SensorBridge};
pub use timeline_service::{RefreshSummary, TimelineService};
