//! Configuration validation utilities

use super::error::{ValidationError, ValidationErrorKind};
use super::schema::EngineConfig;
use std::collections::HashMap;
use tracing::warn;

/// Validator applying cross-provider rules on top of [`EngineConfig::validate`]
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_enabled_providers(config)?;
        self.validate_one_provider_per_kind(config)?;
        self.warn_on_missing_credentials(config);

        Ok(())
    }

    fn validate_enabled_providers(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        if !config.providers.iter().any(|p| p.enabled) {
            return Err(ValidationError::new(
                "providers",
                ValidationErrorKind::RequiredFieldMissing,
            )
            .with_context("At least one provider must be enabled"));
        }
        Ok(())
    }

    /// Models route to an adapter by provider type, so two enabled providers
    /// of the same type would be ambiguous.
    fn validate_one_provider_per_kind(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        let mut seen = HashMap::new();
        for (i, provider) in config.providers.iter().enumerate().filter(|(_, p)| p.enabled) {
            if let Some(first) = seen.insert(provider.kind, &provider.name) {
                return Err(ValidationError::duplicate(
                    format!("providers[{}].type", i),
                    provider.kind.to_string(),
                )
                .with_context(format!("'{}' already uses this provider type", first)));
            }
        }
        Ok(())
    }

    fn warn_on_missing_credentials(&self, config: &EngineConfig) {
        for provider in config.providers.iter().filter(|p| p.enabled) {
            if provider.api_key.as_ref().is_none_or(|k| k.is_empty()) {
                warn!(provider = %provider.name, "No API key configured; invocations will fail");
            }
        }
    }
}
