//! Transport errors and HTTP status mapping

use crate::providers::error::InvocationError;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failures below the HTTP status line
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response size {size} exceeds maximum {limit}")]
    ResponseTooLarge { size: u64, limit: u64 },

    #[error("{0}")]
    Request(String),
}

impl From<TransportError> for InvocationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(after) => {
                InvocationError::timed_out(format!("no response within {}s", after.as_secs_f64()))
            }
            TransportError::ResponseTooLarge { size, limit } => InvocationError::provider(format!(
                "Response too large: {} bytes exceeds the {} byte limit",
                size, limit
            )),
            other => InvocationError::provider(format!("Network error: {}", other)),
        }
    }
}

/// Map a non-success status and its body onto the invocation taxonomy.
///
/// 401 means the key was rejected, 429 is throttling (hint from the body,
/// then the `Retry-After` header), and everything else is a provider error
/// carrying the body's message or the status line.
pub fn map_http_error(
    status: StatusCode,
    retry_after_header: Option<Duration>,
    body: Option<&str>,
    model: &str,
) -> InvocationError {
    let details = body
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_details(&v));

    let message = details
        .as_ref()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| status_line(status));

    match status {
        StatusCode::UNAUTHORIZED => InvocationError::missing_credential(model),

        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = details
                .and_then(|d| d.retry_after_seconds)
                .map(Duration::from_secs)
                .or(retry_after_header);
            InvocationError::rate_limited(message, retry_after)
        }

        _ => InvocationError::provider(message),
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

struct ErrorDetails {
    message: String,
    retry_after_seconds: Option<u64>,
}

fn extract_error_details(json: &Value) -> Option<ErrorDetails> {
    // OpenAI format: { "error": { "message": "...", "type": "...", "code": "..." } }
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            return Some(ErrorDetails {
                message: message.to_string(),
                retry_after_seconds: retry_after_field(error).or_else(|| retry_after_field(json)),
            });
        }
        if let Some(message) = error.as_str() {
            return Some(ErrorDetails {
                message: message.to_string(),
                retry_after_seconds: retry_after_field(json),
            });
        }
    }

    // Generic format: { "message": "...", "retry_after": 5 }
    json.get("message")
        .and_then(|v| v.as_str())
        .map(|message| ErrorDetails {
            message: message.to_string(),
            retry_after_seconds: retry_after_field(json),
        })
}

/// `retry_after` as a number or numeric string, rounded up to whole seconds
fn retry_after_field(json: &Value) -> Option<u64> {
    let value = json.get("retry_after")?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|s| *s >= 0.0).map(|s| s.ceil() as u64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Parse Retry-After header value (delta-seconds form)
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    header_value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
