//! Photo catalog access.
//!
//! The catalog is an external, read-only HTTP API that serves album and photo
//! metadata plus image bytes addressed by content hash. This module provides:
//!
//! - [`CatalogClient`]: the trait the timeline builder depends on
//! - [`HttpCatalogClient`]: the `reqwest` implementation
//! - [`ImageUrlBuilder`]: display URL construction from content hashes

mod client;
mod types;

pub use client::{CatalogClient, CatalogError, CatalogResult, HttpCatalogClient, ImageUrlBuilder};
pub use types::{RawAlbum, RawPhoto};
