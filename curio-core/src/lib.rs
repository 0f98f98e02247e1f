//! Curio Core Library
//!
//! The LLM invocation engine behind Curio: send a prompt to the provider a
//! model id resolves to, bound it by a timeout, retry transient failures and
//! return output, token usage, cost and duration.
//!
//! ```no_run
//! use curio_core::{InvocationRequest, ModelRouter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = ModelRouter::from_env()?;
//! let request = InvocationRequest::new("gpt-4o-mini", "Be brief.", "Summarize the passage.")
//!     .with_structured_output();
//! let result = router.invoke(&request).await?;
//! println!("{} tokens, ${:.6}", result.token_usage.total, result.cost);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod http;
pub mod providers;
pub mod structured;

pub use config::{EngineConfig, SecretString};
pub use engine::{
    InvocationObserver, InvocationOutput, InvocationRequest, InvocationResult, ModelRouter,
    TokenUsage,
};
pub use providers::{ErrorKind, InvocationError, ProviderKind};

/// Returns the version of the Curio Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
