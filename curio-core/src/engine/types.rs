//! Request and result values exchanged with the engine

use crate::providers::adapter::ReportedUsage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Input to [`super::ModelRouter::invoke`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Selects both the provider and the concrete model
    pub model: String,

    /// Already-formatted system prompt; may be empty
    #[serde(default)]
    pub system_text: String,

    /// Already-formatted user prompt; may be empty
    #[serde(default)]
    pub user_text: String,

    /// Return parsed JSON instead of raw text
    #[serde(default)]
    pub structured_output_requested: bool,

    /// Falls back to the engine default (0.3) when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Falls back to the model's configured cap, then 4096
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl InvocationRequest {
    pub fn new(
        model: impl Into<String>,
        system_text: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_text: system_text.into(),
            user_text: user_text.into(),
            structured_output_requested: false,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_structured_output(mut self) -> Self {
        self.structured_output_requested = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// What the caller gets back as the completion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvocationOutput {
    /// Trimmed provider text, returned verbatim
    Text(String),

    /// Structured output that parsed
    Structured(Value),

    /// Structured output was requested but the text did not parse
    Unparsed {
        raw: String,
        #[serde(rename = "parseError")]
        parse_error: String,
    },
}

impl InvocationOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            _ => None,
        }
    }

    /// True when structured output fell back to raw text
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Unparsed { .. })
    }

    /// The output as a single JSON value, in its serialized shape
    pub fn into_value(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text),
            Self::Structured(value) => value,
            Self::Unparsed { raw, parse_error } => json!({ "raw": raw, "parseError": parse_error }),
        }
    }
}

/// Token counts for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl From<ReportedUsage> for TokenUsage {
    fn from(usage: ReportedUsage) -> Self {
        Self {
            input: usage.input_tokens,
            output: usage.output_tokens,
            total: usage
                .total_tokens
                .unwrap_or_else(|| usage.input_tokens.saturating_add(usage.output_tokens)),
        }
    }
}

/// Output of a successful invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    pub output: InvocationOutput,
    pub token_usage: TokenUsage,
    /// USD, from the model's price table
    pub cost: f64,
    /// Wall-clock time including retries and backoff
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_defaults_to_sum() {
        let usage = TokenUsage::from(ReportedUsage {
            input_tokens: 120,
            output_tokens: 30,
            total_tokens: None,
        });
        assert_eq!(usage.total, 150);

        let usage = TokenUsage::from(ReportedUsage {
            input_tokens: 120,
            output_tokens: 30,
            total_tokens: Some(155),
        });
        assert_eq!(usage.total, 155);
    }

    #[test]
    fn test_unparsed_output_serializes_with_parse_error_key() {
        let output = InvocationOutput::Unparsed {
            raw: "not json at all".to_string(),
            parse_error: "expected value".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"raw": "not json at all", "parseError": "expected value"})
        );
        assert_eq!(
            output.into_value(),
            json!({"raw": "not json at all", "parseError": "expected value"})
        );
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: InvocationRequest =
            serde_json::from_str(r#"{"model": "gpt-4o-mini", "user_text": "hi"}"#).unwrap();
        assert_eq!(request, InvocationRequest::new("gpt-4o-mini", "", "hi"));
    }
}
