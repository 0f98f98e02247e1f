//! Provider adapters and the policies around them
//!
//! Each provider implements [`ProviderAdapter`]; the engine picks one by
//! [`ProviderKind`] and wraps calls in the [`RetryPolicy`].

pub mod adapter;
pub mod anthropic;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod retry;

pub use adapter::{Completion, CompletionRequest, ProviderAdapter, ProviderKind, ReportedUsage};
pub use anthropic::AnthropicAdapter;
pub use error::{ErrorKind, InvocationError, ProviderResult, DEFAULT_RETRY_AFTER_SECS};
pub use openai::OpenAIAdapter;
pub use prompt::{Prompt, PromptMessage, Role, JSON_INSTRUCTION};
pub use retry::{RetryDecision, RetryPolicy};
