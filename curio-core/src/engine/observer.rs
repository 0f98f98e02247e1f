//! Hooks for watching an invocation from the outside
//!
//! The engine reports progress through an [`InvocationObserver`] instead of
//! logging directly. [`TracingObserver`] is the default.

use super::types::InvocationResult;
use crate::providers::adapter::ProviderKind;
use crate::providers::error::InvocationError;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identifies one attempt within an invocation
#[derive(Debug, Clone, Copy)]
pub struct AttemptEvent<'a> {
    pub model: &'a str,
    pub provider: ProviderKind,
    /// Zero-indexed
    pub attempt: u32,
    pub max_attempts: u32,
    pub request_id: Uuid,
}

/// Observer for invocation lifecycle events. All methods default to no-ops.
pub trait InvocationObserver: Send + Sync {
    fn on_attempt(&self, _event: &AttemptEvent<'_>) {}

    /// A failed attempt that will be retried after `delay`
    fn on_retry(&self, _event: &AttemptEvent<'_>, _error: &InvocationError, _delay: Duration) {}

    /// Structured output was requested but fell back to raw text
    fn on_output_degraded(&self, _model: &str, _error: &InvocationError) {}

    fn on_success(&self, _model: &str, _result: &InvocationResult) {}

    fn on_failure(&self, _model: &str, _error: &InvocationError) {}
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl InvocationObserver for NoopObserver {}

/// Emits `tracing` events for each lifecycle step
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl InvocationObserver for TracingObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        debug!(
            model = event.model,
            provider = %event.provider,
            attempt = event.attempt + 1,
            max_attempts = event.max_attempts,
            request_id = %event.request_id,
            "Calling provider"
        );
    }

    fn on_retry(&self, event: &AttemptEvent<'_>, err: &InvocationError, delay: Duration) {
        warn!(
            model = event.model,
            provider = %event.provider,
            attempt = event.attempt + 1,
            kind = %err.kind(),
            delay_ms = delay.as_millis() as u64,
            request_id = %event.request_id,
            error = %err,
            "Attempt failed, retrying"
        );
    }

    fn on_output_degraded(&self, model: &str, err: &InvocationError) {
        warn!(model, error = %err, "Structured output did not parse, returning raw text");
    }

    fn on_success(&self, model: &str, result: &InvocationResult) {
        info!(
            model,
            input_tokens = result.token_usage.input,
            output_tokens = result.token_usage.output,
            cost = result.cost,
            duration_ms = result.duration_ms,
            "Invocation completed"
        );
    }

    fn on_failure(&self, model: &str, err: &InvocationError) {
        error!(model, kind = %err.kind(), error = %err, "Invocation failed");
    }
}
