use serde::{Deserialize, Serialize};

/// The error taxonomy from spec §7, shared across crates so that bus
/// consumers can decide nack+requeue vs. dead-letter vs. "surface and
/// exit" without string-matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Network, broker, LLM 5xx, rate-limit: retried with backoff.
    TransientExternal,
    /// Unparseable LLM output, schema-invalid plan: falls back rather than
    /// crashing the agent.
    ContractViolation,
    /// Non-allow-listed tool, sandbox escape, risk above ceiling.
    PolicyDeny,
    /// Idempotency hit: silently dropped with acknowledgement.
    Duplicate,
    /// Configuration missing, corrupted store: process exits non-zero.
    Fatal,
}

impl ErrorCategory {
    /// Whether a message carrying this error should be nacked and requeued
    /// rather than dead-lettered or dropped.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::TransientExternal)
    }
}
