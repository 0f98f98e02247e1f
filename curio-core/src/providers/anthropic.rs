//! Anthropic provider slot
//!
//! Recognized so that configs and model routing can name it, but there is no
//! wire implementation yet: every call fails closed with a provider error.
//! A real adapter replaces this type and keeps the [`ProviderAdapter`] contract.

use crate::providers::adapter::{Completion, CompletionRequest, ProviderAdapter, ProviderKind};
use crate::providers::error::{InvocationError, ProviderResult};
use async_trait::async_trait;

#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicAdapter;

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, _request: &CompletionRequest) -> ProviderResult<Completion> {
        Err(InvocationError::provider("not yet implemented"))
    }
}
