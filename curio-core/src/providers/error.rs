//! Invocation error taxonomy
//!
//! Every failure the engine can surface is one of five kinds. Callers branch on
//! the variant (or on [`ErrorKind`]) instead of matching message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Fallback cooldown when a provider throttles without a retry hint
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, InvocationError>;

/// Errors that can occur while invoking a language model
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvocationError {
    /// Provider signaled throttling (HTTP 429)
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        /// Cooldown hint supplied by the provider, if any
        retry_after: Option<Duration>,
    },

    /// The completion could not be parsed into the requested structure
    #[error("Invalid structured output: {message}")]
    InvalidStructuredOutput { message: String, raw_output: String },

    /// The call did not complete within the configured deadline
    #[error("Request timed out: {message}")]
    TimedOut { message: String },

    /// No credential is configured for the model's provider
    #[error("API key not found for model: {model}")]
    MissingCredential { model: String },

    /// Any other provider-reported failure
    #[error("Provider error: {message}")]
    ProviderError { message: String },
}

/// Fieldless discriminant of [`InvocationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    InvalidStructuredOutput,
    TimedOut,
    MissingCredential,
    ProviderError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate_limited",
            Self::InvalidStructuredOutput => "invalid_structured_output",
            Self::TimedOut => "timed_out",
            Self::MissingCredential => "missing_credential",
            Self::ProviderError => "provider_error",
        };
        f.write_str(name)
    }
}

impl InvocationError {
    /// Build a rate-limit error, keeping the provider hint when one was given
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    pub fn invalid_structured_output(
        message: impl Into<String>,
        raw_output: impl Into<String>,
    ) -> Self {
        Self::InvalidStructuredOutput {
            message: message.into(),
            raw_output: raw_output.into(),
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::TimedOut {
            message: message.into(),
        }
    }

    pub fn missing_credential(model: impl Into<String>) -> Self {
        Self::MissingCredential {
            model: model.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::ProviderError {
            message: message.into(),
        }
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::InvalidStructuredOutput { .. } => ErrorKind::InvalidStructuredOutput,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::MissingCredential { .. } => ErrorKind::MissingCredential,
            Self::ProviderError { .. } => ErrorKind::ProviderError,
        }
    }

    /// Whether a later attempt could succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::TimedOut { .. } => true,
            Self::ProviderError { .. } => true,
            Self::MissingCredential { .. } => false,
            Self::InvalidStructuredOutput { .. } => false,
        }
    }

    /// Cooldown in whole seconds for a rate-limit error, falling back to
    /// [`DEFAULT_RETRY_AFTER_SECS`] when the provider gave no hint
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(
                retry_after
                    .map(|d| d.as_secs())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            ),
            _ => None,
        }
    }

    /// Provider-supplied cooldown, without the fallback
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Raw completion text carried by a structured-output failure
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::InvalidStructuredOutput { raw_output, .. } => Some(raw_output),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for InvocationError {
    fn from(err: serde_json::Error) -> Self {
        InvocationError::provider(format!("Failed to parse response: {}", err))
    }
}
