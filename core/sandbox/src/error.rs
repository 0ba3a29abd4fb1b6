use shared_types::ErrorCategory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("path escapes sandbox root: {0}")]
    PathEscape(String),
    #[error("command not in allow-list: {0}")]
    CommandNotAllowed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl SandboxError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SandboxError::UnknownTool(_)
            | SandboxError::PathEscape(_)
            | SandboxError::CommandNotAllowed(_) => ErrorCategory::PolicyDeny,
            SandboxError::Io(_) | SandboxError::Request(_) => ErrorCategory::TransientExternal,
        }
    }
}
