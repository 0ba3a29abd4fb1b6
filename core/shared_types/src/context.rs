use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::incident::{GitCommit, LogEntry};

/// Capability-scoped source tag used both to record which sources were
/// consulted and to key per-source gathering errors (spec §4.2).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Logs,
    HistoryIndex,
    CodeHistory,
    PublicKnowledge,
}

impl std::fmt::Display for ContextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContextSource::Logs => "logs",
            ContextSource::HistoryIndex => "history_index",
            ContextSource::CodeHistory => "code_history",
            ContextSource::PublicKnowledge => "public_knowledge",
        };
        write!(f, "{s}")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SimilarIncident {
    pub incident_id: String,
    pub similarity_score: f32,
    pub summary: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub score: f32,
}

/// The Planner's working set for one incident, assembled by the Context
/// Enricher from up to four bounded sources (spec §4.2).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EnrichedContext {
    #[serde(default)]
    pub loki_logs: Vec<LogEntry>,
    #[serde(default)]
    pub similar_incidents: Vec<SimilarIncident>,
    #[serde(default)]
    pub recent_commits: Vec<GitCommit>,
    #[serde(default)]
    pub web_knowledge: Vec<WebResult>,

    #[serde(default)]
    pub sources_used: Vec<ContextSource>,

    /// Strongest historical-match similarity, lightly boosted when
    /// corroborated by other matches. Always in `[0, 1]`.
    #[serde(default)]
    pub internal_confidence: f32,

    #[serde(default)]
    pub web_search_triggered: bool,
    #[serde(default)]
    pub web_search_reason: String,

    #[serde(default)]
    pub gathering_errors: HashMap<ContextSource, String>,
    #[serde(default)]
    pub gathering_time_ms: u64,
}

impl EnrichedContext {
    pub fn mark_used(&mut self, source: ContextSource) {
        if !self.sources_used.contains(&source) {
            self.sources_used.push(source);
        }
    }
}

/// A resolved incident's embedding-indexed summary, owned by the Learner
/// and read by the Context Enricher's HistoryIndex source only through the
/// narrow `upsert`/`knn_query` capability interface (spec §9).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HistoricalIncident {
    pub incident_id: String,
    pub embedding: Vec<f32>,
    pub summary: String,
    pub service: Option<String>,
    pub severity: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source: String,
    #[serde(default)]
    pub resolution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_used_is_idempotent() {
        let mut ctx = EnrichedContext::default();
        ctx.mark_used(ContextSource::Logs);
        ctx.mark_used(ContextSource::Logs);
        assert_eq!(ctx.sources_used.len(), 1);
    }
}
