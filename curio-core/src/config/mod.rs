//! Configuration for the invocation engine
//!
//! Configs load from YAML or JSON files, get `${ENV_VAR}` references resolved and
//! are validated before use. [`EngineConfig`] doubles as the default
//! [`ModelCatalog`] and [`CostModel`].

mod catalog;
mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use catalog::{CostModel, ModelCatalog};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{ConnectionConfig, DefaultConfig, EngineConfig, ModelConfig, ProviderConfig};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use crate::providers::adapter::ProviderKind;
use std::fs;
use std::path::Path;

/// On-disk config syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// `.json` is JSON; anything else is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }

    fn parse(self, content: &str, path: &Path) -> ConfigResult<EngineConfig> {
        let parse_error = |line, column, message: String| ConfigError::Parse {
            path: path.display().to_string(),
            line,
            column,
            message,
        };

        match self {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                let location = e.location();
                parse_error(
                    location.as_ref().map(|l| l.line()),
                    location.as_ref().map(|l| l.column()),
                    e.to_string(),
                )
            }),
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| parse_error(Some(e.line()), Some(e.column()), e.to_string())),
        }
    }
}

/// Load, interpolate and validate a config, picking the format from the
/// file extension
pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<EngineConfig> {
    let path = path.as_ref();
    load_as(path, ConfigFormat::from_path(path))
}

pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<EngineConfig> {
    load_as(path.as_ref(), ConfigFormat::Yaml)
}

pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<EngineConfig> {
    load_as(path.as_ref(), ConfigFormat::Json)
}

fn load_as(path: &Path, format: ConfigFormat) -> ConfigResult<EngineConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    finish(format.parse(&content, path)?)
}

impl EngineConfig {
    /// Single OpenAI provider built from `OPENAI_API_KEY` and, when set,
    /// `OPENAI_BASE_URL`. Any model id routes to it.
    pub fn from_env() -> ConfigResult<Self> {
        let provider = ProviderConfig {
            name: "openai".to_string(),
            kind: ProviderKind::OpenAI,
            api_key: std::env::var("OPENAI_API_KEY").ok().map(SecretString::new),
            base_url: std::env::var("OPENAI_BASE_URL").ok(),
            models: Vec::new(),
            model_prefixes: vec![String::new()],
            enabled: true,
        };

        finish(EngineConfig {
            providers: vec![provider],
            ..Default::default()
        })
    }
}

fn finish(mut config: EngineConfig) -> ConfigResult<EngineConfig> {
    env::interpolate_config_env_vars(&mut config)?;
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}
