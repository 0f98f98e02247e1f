//! Provider adapter trait and provider selection
//!
//! An adapter turns one [`CompletionRequest`] into one wire call and
//! normalizes the reply into a [`Completion`] or an [`InvocationError`].
//! Adapters hold no state across calls.

use crate::config::SecretString;
use crate::providers::error::ProviderResult;
use crate::providers::prompt::Prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Core trait that every LLM provider implements
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Issue a single completion call
    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<Completion>;
}

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    /// Recognized but not implemented; its adapter always fails
    Anthropic,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Public API endpoint used when the config sets no base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything an adapter needs for one call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub api_key: SecretString,
    pub model: String,
    pub prompt: Prompt,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub structured_output_requested: bool,
    /// Correlation id sent with the request and attached to log lines
    pub request_id: Uuid,
}

/// Token counts as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportedUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: Option<u64>,
}

/// Normalized provider reply
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Trimmed completion text; empty when the provider returned no choice
    pub text: String,
    pub usage: ReportedUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_serde_names() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAI);
        assert_eq!(serde_json::to_string(&ProviderKind::Anthropic).unwrap(), "\"anthropic\"");
        assert_eq!(ProviderKind::OpenAI.to_string(), "openai");
    }
}
