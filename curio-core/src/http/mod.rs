//! HTTP transport for provider calls
//!
//! Adapters speak to the network through [`HttpTransport`], a single
//! "POST JSON with bearer auth and a deadline" primitive. [`client::HttpClient`]
//! is the reqwest-backed implementation; tests substitute their own.

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::{map_http_error, parse_retry_after, TransportError};

use crate::config::SecretString;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// One outbound JSON POST
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub bearer_token: SecretString,
    pub body: Value,
    pub timeout: Duration,
    /// Sent as `X-Request-ID` for correlation
    pub request_id: Uuid,
}

/// Status, retry hint and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, when present
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP executors
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
