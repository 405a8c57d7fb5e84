//! HTTP error types

use crate::types::HttpMethodError;

/// Error type for HTTP operations
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(#[from] HttpMethodError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("No mock response available in offline mode for {method} {url}")]
    NoMock { method: String, url: String },
}

impl HttpError {
    /// Whether the request hit the configured timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::NetworkError(e) if e.is_timeout())
    }

    /// Whether the target could not be reached at all
    pub fn is_connect(&self) -> bool {
        matches!(self, HttpError::NetworkError(e) if e.is_connect())
    }
}
