//! HTTP transport for the photo catalog API.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::types::{RawAlbum, RawPhoto};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request to the catalog failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Catalog returned a non-success HTTP status.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Catalog returned JSON that is not the expected array of records.
    #[error("Unexpected catalog response: {0}")]
    UnexpectedShape(String),
}

/// Convenient Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// ─────────────────────────────────────────────────────────────────────────────
// Client Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only access to album and photo metadata.
///
/// The timeline builder depends on this trait so tests can provide canned
/// catalogs without a running HTTP server.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Lists up to `count` albums.
    async fn list_albums(&self, count: u32) -> CatalogResult<Vec<RawAlbum>>;

    /// Lists up to `count` public photos of the album with the given UID.
    async fn list_photos(&self, album_uid: &str, count: u32) -> CatalogResult<Vec<RawPhoto>>;
}

/// Catalog client backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Creates a client for the catalog rooted at `base_url` (e.g. `http://host:2342/api/v1`).
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Returns the catalog base address.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches `{base}/{path}` with `params` and decodes it as a JSON array of `T`.
    ///
    /// Elements that do not decode are skipped with a warning; a body that is
    /// not an array at all is an [`CatalogError::UnexpectedShape`].
    async fn get_records<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> CatalogResult<Vec<T>> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("[Catalog] GET {} {:?}", url, params);

        let res = self.client.get(&url).query(params).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CatalogError::HttpStatus(status.as_u16(), body));
        }

        let body: Value = res.json().await?;
        let Value::Array(items) = body else {
            return Err(CatalogError::UnexpectedShape(describe_shape(&body)));
        };

        let records = items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match serde_json::from_value::<T>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("[Catalog] Skipping malformed record #{} from {}: {}", i, url, e);
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_albums(&self, count: u32) -> CatalogResult<Vec<RawAlbum>> {
        let count = count.to_string();
        self.get_records("albums", &[("count", count.as_str())]).await
    }

    async fn list_photos(&self, album_uid: &str, count: u32) -> CatalogResult<Vec<RawPhoto>> {
        let count = count.to_string();
        self.get_records(
            "photos",
            &[("album", album_uid), ("public", "true"), ("count", count.as_str())],
        )
        .await
    }
}

/// Short description of a JSON value for error messages.
fn describe_shape(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    let mut text = value.to_string();
    if text.len() > 200 {
        let cut = (0..=200).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
        text.truncate(cut);
        text.push('…');
    }
    format!("expected array, got {}: {}", kind, text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Display URLs
// ─────────────────────────────────────────────────────────────────────────────

/// Builds display URLs for photos from their content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrlBuilder {
    base_url: String,
    variant: String,
}

impl ImageUrlBuilder {
    /// Creates a builder for the catalog at `base_url` rendering `variant` thumbnails.
    pub fn new(base_url: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            variant: variant.into(),
        }
    }

    /// Returns `{base}/t/<hash>/public/<variant>`.
    #[must_use]
    pub fn display_url(&self, content_hash: &str) -> String {
        format!("{}/t/{}/public/{}", self.base_url, content_hash, self.variant)
    }
}
