//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::EngineConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::LazyLock;
use tracing::warn;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid"));

/// Replace every `${VAR}` in `value`, failing on the first unset variable
pub fn interpolate_env_vars(value: &str) -> Result<String, ConfigError> {
    let mut result = value.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(value) {
        let var_name = &cap[1];
        let env_value = env::var(var_name).map_err(|_| ConfigError::MissingEnvVar {
            var: var_name.to_string(),
        })?;
        result = result.replace(&cap[0], &env_value);
    }

    Ok(result)
}

/// Names of all `${VAR}` references in `text`
pub fn referenced_env_vars(text: &str) -> Vec<String> {
    ENV_VAR_PATTERN
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Referenced variables that are not set in the environment
fn unset_env_vars(text: &str) -> Vec<String> {
    referenced_env_vars(text)
        .into_iter()
        .filter(|var| env::var(var).is_err())
        .collect()
}

/// Interpolate environment variables in a loaded config.
///
/// An API key whose variable is unset becomes `None` so that the provider
/// stays loadable and invocations report the missing credential. Any other
/// unset variable is a load error.
pub fn interpolate_config_env_vars(config: &mut EngineConfig) -> Result<(), ConfigError> {
    for provider in &mut config.providers {
        if let Some(api_key) = &provider.api_key {
            let raw = api_key.expose_secret();
            if ENV_VAR_PATTERN.is_match(raw) {
                provider.api_key = match interpolate_env_vars(raw) {
                    Ok(value) => Some(SecretString::new(value)),
                    Err(ConfigError::MissingEnvVar { .. }) => {
                        warn!(
                            provider = %provider.name,
                            unset = ?unset_env_vars(raw),
                            "API key variable is not set"
                        );
                        None
                    }
                    Err(e) => return Err(e),
                };
            }
        }

        if let Some(base_url) = &provider.base_url {
            if ENV_VAR_PATTERN.is_match(base_url) {
                provider.base_url = Some(interpolate_env_vars(base_url)?);
            }
        }
    }

    Ok(())
}
