//! Centralized error types for the tape relay core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::bus::BusError;
use crate::catalog::CatalogError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for CatalogError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "catalog_request_failed",
            Self::HttpStatus(_, _) => "catalog_error_status",
            Self::UnexpectedShape(_) => "catalog_unexpected_response",
        }
    }
}

impl ErrorCode for BusError {
    fn code(&self) -> &'static str {
        match self {
            Self::Publish(_) => "bus_publish_failed",
            Self::Subscribe(_) => "bus_subscribe_failed",
            Self::Encode(_) => "bus_encode_failed",
        }
    }
}

/// Application-wide error type for the tape relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Photo catalog request failed or returned unusable data.
    #[error("Catalog request failed: {0}")]
    Catalog(String),

    /// A timeline rebuild is already running.
    #[error("Timeline refresh already in progress")]
    RefreshInProgress,

    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog_error",
            Self::RefreshInProgress => "refresh_in_progress",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RefreshInProgress => StatusCode::CONFLICT,
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Re-export Result type aliases from their defining modules
pub use crate::bus::BusResult;
pub use crate::catalog::CatalogResult;

/// Convenient Result alias for application-wide operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for RelayError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_in_progress_maps_to_conflict() {
        let err = RelayError::RefreshInProgress;
        assert_eq!(err.code(), "refresh_in_progress");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn catalog_error_converts_to_bad_gateway() {
        let err: RelayError = CatalogError::UnexpectedShape("object".into()).into();
        assert_eq!(err.code(), "catalog_error");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn bus_error_codes_are_distinct() {
        assert_eq!(BusError::Publish("x".into()).code(), "bus_publish_failed");
        assert_eq!(BusError::Subscribe("x".into()).code(), "bus_subscribe_failed");
    }
}
