//! OpenAI client implementation

use super::converter::{from_openai_response, to_openai_request};
use super::types::OpenAIResponse;
use crate::http::{map_http_error, HttpRequest, HttpTransport};
use crate::providers::adapter::{Completion, CompletionRequest, ProviderAdapter, ProviderKind};
use crate::providers::error::{InvocationError, ProviderResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Hard deadline for one chat-completion call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI chat-completions adapter
pub struct OpenAIAdapter {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl OpenAIAdapter {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<Completion> {
        let body = serde_json::to_value(to_openai_request(request))?;
        let http_request = HttpRequest {
            url: self.endpoint(),
            bearer_token: request.api_key.clone(),
            body,
            timeout: self.timeout,
            request_id: request.request_id,
        };

        // The transport applies the same deadline; this bounds it regardless
        // of how the transport is implemented.
        let response = tokio::time::timeout(self.timeout, self.transport.post_json(http_request))
            .await
            .map_err(|_| {
                InvocationError::timed_out(format!(
                    "no response from openai within {}s",
                    self.timeout.as_secs_f64()
                ))
            })??;

        if !response.is_success() {
            warn!(
                status = response.status,
                request_id = %request.request_id,
                model = %request.model,
                "OpenAI returned an error status"
            );
            return Err(match StatusCode::from_u16(response.status) {
                Ok(status) => map_http_error(
                    status,
                    response.retry_after,
                    Some(&response.body),
                    &request.model,
                ),
                Err(_) => InvocationError::provider(format!("HTTP {}", response.status)),
            });
        }

        let parsed: OpenAIResponse = serde_json::from_str(&response.body).map_err(|e| {
            InvocationError::provider(format!("Malformed response body from openai: {}", e))
        })?;

        let completion = from_openai_response(parsed);
        debug!(
            request_id = %request.request_id,
            chars = completion.text.len(),
            "OpenAI completion received"
        );

        Ok(completion)
    }
}
