//! Configuration schema structures with serde support

use super::error::ValidationError;
use super::secrets::SecretString;
use crate::providers::adapter::ProviderKind;
use crate::providers::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Root configuration for the invocation engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// LLM providers, at most one enabled per provider type
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub defaults: DefaultConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// LLM Provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ProviderKind,

    /// API key (supports `${ENV_VAR}` interpolation). An unset key is not a
    /// load error; invocations for this provider fail with a missing credential.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Base URL for the provider API; the provider's public endpoint when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// Explicitly configured models
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Unlisted model ids starting with one of these prefixes also route here
    #[serde(default)]
    pub model_prefixes: Vec<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Model configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Model identifier (e.g., "gpt-4o-mini")
    pub id: String,

    /// Default output token cap when the request does not set one
    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    /// Cost per 1K input tokens (in USD)
    #[serde(default)]
    pub cost_per_1k_input: Option<f64>,

    /// Cost per 1K output tokens (in USD)
    #[serde(default)]
    pub cost_per_1k_output: Option<f64>,
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Hard deadline for a single provider call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Default generation parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Fallback output token cap for models without their own
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_true() -> bool { true }
fn default_temperature() -> f32 { 0.3 }
fn default_max_output_tokens() -> u32 { 4096 }
fn default_request_timeout() -> u64 { 60 }
fn default_connect_timeout() -> u64 { 10 }

impl EngineConfig {
    /// Find the enabled provider serving `model`: an exact model id match
    /// wins over a prefix match.
    pub fn provider_for(&self, model: &str) -> Option<&ProviderConfig> {
        let enabled = || self.providers.iter().filter(|p| p.enabled);

        enabled()
            .find(|p| p.models.iter().any(|m| m.id == model))
            .or_else(|| {
                enabled().find(|p| p.model_prefixes.iter().any(|prefix| model.starts_with(prefix.as_str())))
            })
    }

    /// Configured entry for `model`, if it is listed explicitly
    pub fn model(&self, model: &str) -> Option<&ModelConfig> {
        self.provider_for(model)
            .and_then(|p| p.models.iter().find(|m| m.id == model))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.providers.is_empty() {
            return Err(ValidationError::required("providers")
                .with_context("At least one provider must be configured"));
        }

        let mut seen_names = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_names.insert(&provider.name) {
                return Err(ValidationError::duplicate(
                    format!("providers[{}].name", i),
                    provider.name.clone(),
                ));
            }
            provider.validate(&format!("providers[{}]", i))?;
        }

        if !(0.0..=2.0).contains(&self.defaults.temperature) {
            return Err(ValidationError::out_of_range(
                "defaults.temperature",
                "Must be between 0.0 and 2.0",
            ));
        }

        if self.defaults.max_output_tokens == 0 {
            return Err(ValidationError::out_of_range(
                "defaults.max_output_tokens",
                "Must be greater than 0",
            ));
        }

        if self.connection.request_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "connection.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        self.retry.validate("retry")
    }
}

impl ProviderConfig {
    /// Validate provider configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::required(format!("{}.name", path)));
        }

        if let Some(base_url) = &self.base_url {
            let field = format!("{}.base_url", path);
            let url = url::Url::parse(base_url)
                .map_err(|e| ValidationError::invalid_url(&field, e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ValidationError::invalid_url(
                    field,
                    format!("URL scheme must be http or https, got: {}", url.scheme()),
                ));
            }
        }

        let mut seen_model_ids = HashSet::new();
        for (i, model) in self.models.iter().enumerate() {
            let model_path = format!("{}.models[{}]", path, i);

            if model.id.is_empty() {
                return Err(ValidationError::required(format!("{}.id", model_path)));
            }
            if !seen_model_ids.insert(&model.id) {
                return Err(ValidationError::duplicate(format!("{}.id", model_path), model.id.clone()));
            }
            model.validate(&model_path)?;
        }

        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.max_output_tokens == Some(0) {
            return Err(ValidationError::out_of_range(
                format!("{}.max_output_tokens", path),
                "Must be greater than 0",
            ));
        }

        for (field, cost) in [
            ("cost_per_1k_input", self.cost_per_1k_input),
            ("cost_per_1k_output", self.cost_per_1k_output),
        ] {
            if cost.is_some_and(|c| c < 0.0 || !c.is_finite()) {
                return Err(ValidationError::out_of_range(
                    format!("{}.{}", path, field),
                    "Must be a non-negative number",
                ));
            }
        }

        Ok(())
    }
}
