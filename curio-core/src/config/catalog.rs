//! Lookup seams the engine consults before calling a provider

use super::schema::EngineConfig;
use super::secrets::SecretString;
use crate::providers::adapter::ProviderKind;

/// Resolves a model id to its provider, credential and token defaults
pub trait ModelCatalog: Send + Sync {
    fn resolve_provider(&self, model: &str) -> Option<ProviderKind>;

    /// Credential for the model's provider; empty keys count as absent
    fn resolve_credential(&self, model: &str) -> Option<SecretString>;

    fn resolve_default_max_tokens(&self, model: &str) -> u32;
}

/// Price table lookup, in USD
pub trait CostModel: Send + Sync {
    fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64;
}

impl ModelCatalog for EngineConfig {
    fn resolve_provider(&self, model: &str) -> Option<ProviderKind> {
        self.provider_for(model).map(|p| p.kind)
    }

    fn resolve_credential(&self, model: &str) -> Option<SecretString> {
        self.provider_for(model)
            .and_then(|p| p.api_key.clone())
            .filter(|key| !key.is_empty())
    }

    fn resolve_default_max_tokens(&self, model: &str) -> u32 {
        self.model(model)
            .and_then(|m| m.max_output_tokens)
            .unwrap_or(self.defaults.max_output_tokens)
    }
}

impl CostModel for EngineConfig {
    /// Unpriced models cost nothing
    fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let Some(entry) = self.model(model) else {
            return 0.0;
        };

        let input = entry.cost_per_1k_input.unwrap_or(0.0) * input_tokens as f64 / 1000.0;
        let output = entry.cost_per_1k_output.unwrap_or(0.0) * output_tokens as f64 / 1000.0;
        input + output
    }
}
