//! Conversion between engine requests and the OpenAI wire format

use super::types::*;
use crate::providers::adapter::{Completion, CompletionRequest, ReportedUsage};
use crate::providers::prompt::{Prompt, Role};

/// Build the chat-completion body.
///
/// Structured requests turn on JSON mode and carry the JSON-only instruction
/// in a system message, which OpenAI requires for `json_object`.
pub fn to_openai_request(request: &CompletionRequest) -> OpenAIRequest {
    let prompt: Prompt = if request.structured_output_requested {
        request.prompt.with_json_instruction()
    } else {
        request.prompt.clone()
    };

    OpenAIRequest {
        model: request.model.clone(),
        messages: prompt
            .messages()
            .iter()
            .map(|m| OpenAIMessage {
                role: match m.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                },
                content: m.content.clone(),
            })
            .collect(),
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
        response_format: request
            .structured_output_requested
            .then(OpenAIResponseFormat::json_object),
    }
}

/// Take the first choice's trimmed content; no choice means empty text
pub fn from_openai_response(response: OpenAIResponse) -> Completion {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    let usage = response
        .usage
        .map(|u| ReportedUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Completion { text, usage }
}
