//! Errors raised while loading or validating an engine config

use crate::http::TransportError;
use thiserror::Error;

/// Anything that keeps a config from becoming a working engine
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config '{path}'{}: {message}", location_suffix(.line, .column))]
    Parse {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A `${VAR}` reference outside an API key whose variable is unset
    #[error("environment variable '{var}' is not set")]
    MissingEnvVar { var: String },

    /// The HTTP client behind the adapters could not be built
    #[error("cannot build HTTP client: {0}")]
    Transport(#[from] TransportError),
}

fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(line), Some(column)) => format!(" at {}:{}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// A rule violation, addressed by the path of the offending field
/// (e.g. `providers[0].base_url`)
#[derive(Debug, Error)]
#[error("invalid config at '{field_path}': {kind}{}", context_suffix(.context))]
pub struct ValidationError {
    pub field_path: String,
    pub kind: ValidationErrorKind,
    pub context: Option<String>,
}

fn context_suffix(context: &Option<String>) -> String {
    context.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationErrorKind {
    #[error("required field is missing")]
    RequiredFieldMissing,

    #[error("value out of range: {message}")]
    OutOfRange { message: String },

    #[error("duplicate value: {value}")]
    DuplicateValue { value: String },

    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn required(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::RequiredFieldMissing)
    }

    pub fn out_of_range(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::OutOfRange {
                message: message.into(),
            },
        )
    }

    pub fn duplicate(field_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::DuplicateValue {
                value: value.into(),
            },
        )
    }

    pub fn invalid_url(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::InvalidUrl {
                message: message.into(),
            },
        )
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
