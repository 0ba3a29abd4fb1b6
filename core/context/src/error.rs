use thiserror::Error;

/// A single source's failure, captured per-source rather than propagated —
/// spec §4.2's "any single source failure is captured into
/// `gathering_errors[source]` and the pipeline proceeds".
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct SourceError(pub String);

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError(err.to_string())
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
