//! Structured-output recovery
//!
//! Providers do not reliably emit bare JSON even when told to. Recovery trims
//! the completion, peels off one markdown fence, narrows to the outermost
//! `{...}` span when prose surrounds it, and only then parses.

use crate::providers::error::InvocationError;
use serde_json::{json, Value};

const FENCE: &str = "```";

/// Recover a JSON value from a raw completion.
///
/// When `structured_output_requested` is false this never fails: the whole
/// text is parsed if it happens to be JSON, otherwise it is wrapped as
/// `{"raw": text}`. When it is true, a parse failure yields
/// [`InvocationError::InvalidStructuredOutput`] carrying the original text.
pub fn recover(raw_text: &str, structured_output_requested: bool) -> Result<Value, InvocationError> {
    if !structured_output_requested {
        return Ok(serde_json::from_str(raw_text).unwrap_or_else(|_| json!({ "raw": raw_text })));
    }

    let unfenced = strip_code_fence(raw_text.trim());
    let candidate = if is_clean_object(unfenced) {
        unfenced
    } else {
        outermost_object_span(unfenced).unwrap_or(unfenced)
    };

    serde_json::from_str(candidate).map_err(|e| {
        InvocationError::invalid_structured_output(
            format!("Failed to parse JSON from completion: {}", e),
            raw_text,
        )
    })
}

/// Remove one leading ```` ``` ```` or ```` ```json ```` marker and one
/// trailing ```` ``` ```` marker, each independently.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text;

    if let Some(rest) = body.strip_prefix(FENCE) {
        body = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
        body = body.trim_start();
    }

    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest.trim_end();
    }

    body
}

fn is_clean_object(text: &str) -> bool {
    text.starts_with('{') && text.ends_with('}')
}

/// Greedy span from the first `{` to the last `}`
fn outermost_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
