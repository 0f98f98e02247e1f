//! HTTP client implementation using reqwest

use crate::http::{parse_retry_after, HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

const USER_AGENT: &str = concat!("curio/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    max_response_size: u64,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::with_connect_timeout(Duration::from_secs(10))
    }

    /// Create a client with a custom connect timeout. Request deadlines are
    /// set per call through [`HttpRequest::timeout`].
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            url,
            bearer_token,
            body,
            timeout,
            request_id,
        } = request;

        debug!(%url, %request_id, key = %bearer_token.fingerprint(), "Sending POST");

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .bearer_auth(bearer_token.expose_secret())
            .header("X-Request-ID", request_id.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(%request_id, error = %e, "Request failed before a response arrived");
                Self::map_reqwest_error(e, timeout)
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        if let Some(size) = response.content_length() {
            if size > self.max_response_size {
                return Err(TransportError::ResponseTooLarge {
                    size,
                    limit: self.max_response_size,
                });
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::map_reqwest_error(e, timeout))?;

        if body.len() as u64 > self.max_response_size {
            return Err(TransportError::ResponseTooLarge {
                size: body.len() as u64,
                limit: self.max_response_size,
            });
        }

        debug!(status, %request_id, "Response received");

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}
