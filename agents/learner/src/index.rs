use async_trait::async_trait;
use shared_types::HistoricalIncident;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("history index request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Write side of the historical incident index (spec §4.5 step 2). The
/// Context Enricher's `HistoryIndexSource` only reads (`knn_query`); the
/// Learner owns the only writer, keeping the vector store behind one
/// narrow capability interface on each side (spec §9).
#[async_trait]
pub trait HistoryIndexWriter: Send + Sync {
    async fn upsert(&self, incident: &HistoricalIncident) -> Result<(), IndexError>;
}

pub struct HttpHistoryIndexWriter {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpHistoryIndexWriter {
    pub fn new(endpoint: String) -> Self {
        Self { http: reqwest::Client::new(), endpoint }
    }
}

#[async_trait]
impl HistoryIndexWriter for HttpHistoryIndexWriter {
    async fn upsert(&self, incident: &HistoricalIncident) -> Result<(), IndexError> {
        if self.endpoint.is_empty() {
            return Ok(());
        }
        self.http.post(format!("{}/upsert", self.endpoint)).json(incident).send().await?;
        Ok(())
    }
}
