use crate::error::SourceResult;
use async_trait::async_trait;
use shared_types::{GitCommit, LogEntry, SimilarIncident, WebResult};

/// Recent + error-filtered logs for a service (spec §4.2 `Logs` source).
#[async_trait]
pub trait LogsSource: Send + Sync {
    async fn recent_logs(&self, service: &str, hours_back: u32) -> SourceResult<Vec<LogEntry>>;
    async fn error_logs(&self, service: &str, hours_back: u32) -> SourceResult<Vec<LogEntry>>;
}

/// k-nearest past incidents by embedding similarity (spec §4.2 `HistoryIndex`).
#[async_trait]
pub trait HistoryIndexSource: Send + Sync {
    async fn knn_query(&self, incident_text: &str, limit: usize) -> SourceResult<Vec<SimilarIncident>>;
}

/// Commits touching the service, plus deployment-tagged history (spec §4.2
/// `CodeHistory`).
#[async_trait]
pub trait CodeHistorySource: Send + Sync {
    async fn recent_commits(&self, service: &str, hours_back: u32) -> SourceResult<Vec<GitCommit>>;
    async fn deployment_history(&self, service: &str, days_back: u32) -> SourceResult<Vec<GitCommit>>;
}

/// Web results for derived queries (spec §4.2 `PublicKnowledge`), gated by
/// confidence rather than always gathered.
#[async_trait]
pub trait PublicKnowledgeSource: Send + Sync {
    async fn search(&self, query: &str) -> SourceResult<Vec<WebResult>>;
}
