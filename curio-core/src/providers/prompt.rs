//! Prompt assembly
//!
//! Message lists are built as values, never patched in place, so the JSON
//! instruction always lands in the same spot relative to the caller's text.

use serde::{Deserialize, Serialize};

/// Instruction appended to (or standing in for) the system message when
/// structured output is requested
pub const JSON_INSTRUCTION: &str =
    "You must respond with valid JSON only. Do not include any text outside the JSON object.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Ordered system/user messages for a single completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    messages: Vec<PromptMessage>,
}

impl Prompt {
    /// System then user message, dropping whichever is empty
    pub fn assemble(system_text: &str, user_text: &str) -> Self {
        let messages = [(Role::System, system_text), (Role::User, user_text)]
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(role, text)| PromptMessage {
                role,
                content: text.to_string(),
            })
            .collect();

        Self { messages }
    }

    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    pub fn system(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// A copy of this prompt whose system message compels JSON-only output.
    ///
    /// A system message that already mentions JSON is left alone, one that
    /// does not gets [`JSON_INSTRUCTION`] appended, and a prompt without one
    /// gets a synthetic system message in front.
    pub fn with_json_instruction(&self) -> Self {
        let has_system = self.system().is_some();

        let mut messages: Vec<PromptMessage> = self
            .messages
            .iter()
            .map(|m| match m.role {
                Role::System if !m.content.to_lowercase().contains("json") => PromptMessage {
                    role: Role::System,
                    content: format!("{}\n\n{}", m.content, JSON_INSTRUCTION),
                },
                _ => m.clone(),
            })
            .collect();

        if !has_system {
            messages.insert(
                0,
                PromptMessage {
                    role: Role::System,
                    content: JSON_INSTRUCTION.to_string(),
                },
            );
        }

        Self { messages }
    }
}
