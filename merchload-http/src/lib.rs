//! HTTP client functionality for merchload
//!
//! This crate provides the [`HttpClient`] seam the scenario issues its calls
//! through, a reqwest-backed [`HttpManager`] with an offline mock mode, and
//! the request/response types shared by both.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-export main types for convenience
pub use client::{HttpClient, HttpManager, MockResponse};
pub use config::HttpConfig;
pub use errors::HttpError;
pub use types::{HttpMethod, HttpMethodError, HttpRequest, HttpResponse, ResponseBody};
