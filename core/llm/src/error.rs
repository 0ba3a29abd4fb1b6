use shared_types::ErrorCategory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to LLM provider failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("LLM provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("circuit breaker open for provider, retry after cooldown")]
    CircuitOpen,
    #[error("no JSON object found in LLM response")]
    NoJsonObject,
    #[error("LLM response was not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

impl LlmError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LlmError::Request(_) | LlmError::Provider { .. } | LlmError::CircuitOpen => {
                ErrorCategory::TransientExternal
            }
            LlmError::NoJsonObject | LlmError::InvalidJson(_) => ErrorCategory::ContractViolation,
        }
    }
}

pub type LlmResult<T> = Result<T, LlmError>;
