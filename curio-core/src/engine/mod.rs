//! Invocation engine
//!
//! [`ModelRouter`] runs one invocation end to end: resolve the model's
//! provider and credential, call the adapter under the retry policy, recover
//! structured output when asked, and account for tokens, cost and time.
//!
//! ```text
//! Configuring -> Attempting -> Succeeded -> RecoveringOutput -> Done
//!                    |  ^
//!                    v  |
//!               RetryWaiting          (non-retryable / final attempt -> Failed)
//! ```
//!
//! Invocations share nothing mutable. A router is safe to call from many
//! tasks at once; callers that need global rate limiting add it outside.

mod observer;
mod types;

pub use observer::{AttemptEvent, InvocationObserver, NoopObserver, TracingObserver};
pub use types::{InvocationOutput, InvocationRequest, InvocationResult, TokenUsage};

use crate::config::{ConfigError, CostModel, EngineConfig, ModelCatalog, SecretString};
use crate::http::HttpClient;
use crate::providers::adapter::{Completion, CompletionRequest, ProviderAdapter, ProviderKind};
use crate::providers::anthropic::AnthropicAdapter;
use crate::providers::error::InvocationError;
use crate::providers::openai::OpenAIAdapter;
use crate::providers::prompt::Prompt;
use crate::providers::retry::{RetryDecision, RetryPolicy};
use crate::structured;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Temperature used when neither the request nor the config sets one
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Per-invocation retry bookkeeping
#[derive(Debug, Default)]
struct RetryState {
    attempt_number: u32,
    last_error: Option<InvocationError>,
}

/// The invocation engine
pub struct ModelRouter {
    catalog: Arc<dyn ModelCatalog>,
    cost_model: Arc<dyn CostModel>,
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    retry_policy: RetryPolicy,
    default_temperature: f32,
    observer: Arc<dyn InvocationObserver>,
}

impl ModelRouter {
    pub fn builder(
        catalog: Arc<dyn ModelCatalog>,
        cost_model: Arc<dyn CostModel>,
    ) -> ModelRouterBuilder {
        ModelRouterBuilder::new(catalog, cost_model)
    }

    /// Router over real adapters for every enabled provider in `config`.
    /// The config itself serves as catalog and price table.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        let connect_timeout = Duration::from_secs(config.connection.connect_timeout_secs);
        let transport = Arc::new(HttpClient::with_connect_timeout(connect_timeout)?);
        let request_timeout = Duration::from_secs(config.connection.request_timeout_secs);
        let config = Arc::new(config);

        let mut builder = ModelRouter::builder(config.clone(), config.clone())
            .retry_policy(config.retry.clone())
            .default_temperature(config.defaults.temperature);

        for provider in config.providers.iter().filter(|p| p.enabled) {
            let base_url = provider
                .base_url
                .clone()
                .unwrap_or_else(|| provider.kind.default_base_url().to_string());

            let adapter: Arc<dyn ProviderAdapter> = match provider.kind {
                ProviderKind::OpenAI => Arc::new(
                    OpenAIAdapter::new(base_url, transport.clone()).with_timeout(request_timeout),
                ),
                ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new()),
            };
            builder = builder.adapter(adapter);
        }

        Ok(builder.build())
    }

    /// [`Self::from_config`] over [`EngineConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(EngineConfig::from_env()?)
    }

    /// Run one invocation to completion or final failure
    pub async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, InvocationError> {
        self.invoke_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Like [`Self::invoke`], but abandons the in-flight call or backoff sleep
    /// as soon as `cancel` fires, failing with [`InvocationError::TimedOut`].
    pub async fn invoke_with_cancellation(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult, InvocationError> {
        let started = Instant::now();

        match self.run(request, cancel, started).await {
            Ok(result) => {
                self.observer.on_success(&request.model, &result);
                Ok(result)
            }
            Err(err) => {
                self.observer.on_failure(&request.model, &err);
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<InvocationResult, InvocationError> {
        let (adapter, completion_request) = self.prepare(request)?;

        let completion = self
            .attempt_with_retries(adapter.as_ref(), &completion_request, cancel)
            .await?;

        let output = self.shape_output(request, completion.text);
        let token_usage = TokenUsage::from(completion.usage);
        let cost = self
            .cost_model
            .cost(&request.model, token_usage.input, token_usage.output);

        Ok(InvocationResult {
            output,
            token_usage,
            cost,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Resolve configuration and assemble the prompt. Nothing here touches
    /// the network.
    fn prepare(
        &self,
        request: &InvocationRequest,
    ) -> Result<(Arc<dyn ProviderAdapter>, CompletionRequest), InvocationError> {
        let model = request.model.as_str();

        let api_key: SecretString = self
            .catalog
            .resolve_credential(model)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| InvocationError::missing_credential(model))?;

        let provider = self
            .catalog
            .resolve_provider(model)
            .ok_or_else(|| InvocationError::provider(format!("No provider configured for model: {}", model)))?;

        let adapter = self
            .adapters
            .get(&provider)
            .cloned()
            .ok_or_else(|| InvocationError::provider(format!("No adapter registered for provider: {}", provider)))?;

        let completion_request = CompletionRequest {
            api_key,
            model: model.to_string(),
            prompt: Prompt::assemble(&request.system_text, &request.user_text),
            temperature: request.temperature.unwrap_or(self.default_temperature),
            max_output_tokens: request
                .max_output_tokens
                .unwrap_or_else(|| self.catalog.resolve_default_max_tokens(model)),
            structured_output_requested: request.structured_output_requested,
            request_id: Uuid::new_v4(),
        };

        Ok((adapter, completion_request))
    }

    /// Strictly sequential attempts under the retry policy
    async fn attempt_with_retries(
        &self,
        adapter: &dyn ProviderAdapter,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Completion, InvocationError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut state = RetryState::default();

        while state.attempt_number < max_attempts {
            let event = AttemptEvent {
                model: &request.model,
                provider: adapter.kind(),
                attempt: state.attempt_number,
                max_attempts,
                request_id: request.request_id,
            };
            self.observer.on_attempt(&event);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                outcome = adapter.complete(request) => outcome,
            };

            let err = match outcome {
                Ok(completion) => return Ok(completion),
                Err(err) => err,
            };

            match self.retry_policy.decide(&err, state.attempt_number) {
                RetryDecision::GiveUp => return Err(err),
                RetryDecision::Retry(delay) => {
                    self.observer.on_retry(&event, &err, delay);
                    state.last_error = Some(err);

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    state.attempt_number += 1;
                }
            }
        }

        Err(state
            .last_error
            .unwrap_or_else(|| InvocationError::provider("no response from provider")))
    }

    /// Raw text passes through; structured output that fails to parse
    /// degrades to raw text plus the parse error instead of failing.
    fn shape_output(&self, request: &InvocationRequest, text: String) -> InvocationOutput {
        if !request.structured_output_requested {
            return InvocationOutput::Text(text);
        }

        match structured::recover(&text, true) {
            Ok(value) => InvocationOutput::Structured(value),
            Err(err) => {
                self.observer.on_output_degraded(&request.model, &err);
                InvocationOutput::Unparsed {
                    raw: text,
                    parse_error: err.to_string(),
                }
            }
        }
    }
}

fn cancelled() -> InvocationError {
    InvocationError::timed_out("invocation cancelled")
}

/// Builder for [`ModelRouter`]
pub struct ModelRouterBuilder {
    catalog: Arc<dyn ModelCatalog>,
    cost_model: Arc<dyn CostModel>,
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    retry_policy: RetryPolicy,
    default_temperature: f32,
    observer: Arc<dyn InvocationObserver>,
}

impl ModelRouterBuilder {
    pub fn new(catalog: Arc<dyn ModelCatalog>, cost_model: Arc<dyn CostModel>) -> Self {
        Self {
            catalog,
            cost_model,
            adapters: HashMap::new(),
            retry_policy: RetryPolicy::default(),
            default_temperature: DEFAULT_TEMPERATURE,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Register an adapter under its own [`ProviderKind`], replacing any
    /// earlier one of the same kind
    pub fn adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn InvocationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> ModelRouter {
        ModelRouter {
            catalog: self.catalog,
            cost_model: self.cost_model,
            adapters: self.adapters,
            retry_policy: self.retry_policy,
            default_temperature: self.default_temperature,
            observer: self.observer,
        }
    }
}
