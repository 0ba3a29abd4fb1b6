use shared_types::ErrorCategory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to acquire pooled connection: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to (de)serialize record: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    /// A corrupted or unreachable store is Fatal per spec §7; agents should
    /// surface it at startup and exit rather than retry forever.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Fatal
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
