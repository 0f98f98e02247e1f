//! OpenAI provider implementation
//!
//! Adapter for the OpenAI chat-completions endpoint, the one provider the
//! engine ships complete.

mod client;
pub mod converter;
pub mod types;

pub use client::OpenAIAdapter;
pub use types::{OpenAIRequest, OpenAIResponse};
