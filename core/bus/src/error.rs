use shared_types::ErrorCategory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("broker connection failed: {0}")]
    Connect(#[source] lapin::Error),
    #[error("channel operation failed: {0}")]
    Channel(#[source] lapin::Error),
    #[error("publish failed: {0}")]
    Publish(#[source] lapin::Error),
    #[error("ack/nack failed: {0}")]
    Ack(#[source] lapin::Error),
    #[error("payload was not valid JSON for the expected type: {0}")]
    Decode(#[source] serde_json::Error),
}

impl BusError {
    /// Broker-level failures are transient; a bad payload is the sender's
    /// contract violation, not ours to retry.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BusError::Connect(_) | BusError::Channel(_) | BusError::Publish(_) | BusError::Ack(_) => {
                ErrorCategory::TransientExternal
            }
            BusError::Decode(_) => ErrorCategory::ContractViolation,
        }
    }
}

pub type BusResult<T> = Result<T, BusError>;
