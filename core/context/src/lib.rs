//! Context Enricher: assembles an `EnrichedContext` from four
//! capability-scoped sources, with confidence-gated web search (spec §4.2).

mod confidence;
mod error;
mod gatherer;
mod query;
mod sources;

pub use confidence::{internal_confidence, should_trigger_web_search};
pub use error::{SourceError, SourceResult};
pub use gatherer::Gatherer;
pub use query::{derive_queries, is_allowed_domain, ALLOWED_DOMAINS, DOMAIN_TERM};
pub use sources::{CodeHistorySource, HistoryIndexSource, LogsSource, PublicKnowledgeSource};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared_types::{GitCommit, Incident, IncidentStatus, LogEntry, Metrics, SimilarIncident, WebResult};
    use std::sync::Arc;

    struct EmptyLogs;
    #[async_trait]
    impl LogsSource for EmptyLogs {
        async fn recent_logs(&self, _service: &str, _hours_back: u32) -> SourceResult<Vec<LogEntry>> {
            Ok(vec![])
        }
        async fn error_logs(&self, _service: &str, _hours_back: u32) -> SourceResult<Vec<LogEntry>> {
            Ok(vec![])
        }
    }

    struct FixedHistory(Vec<SimilarIncident>);
    #[async_trait]
    impl HistoryIndexSource for FixedHistory {
        async fn knn_query(&self, _text: &str, _limit: usize) -> SourceResult<Vec<SimilarIncident>> {
            Ok(self.0.clone())
        }
    }

    struct EmptyCodeHistory;
    #[async_trait]
    impl CodeHistorySource for EmptyCodeHistory {
        async fn recent_commits(&self, _service: &str, _hours_back: u32) -> SourceResult<Vec<GitCommit>> {
            Ok(vec![])
        }
        async fn deployment_history(&self, _service: &str, _days_back: u32) -> SourceResult<Vec<GitCommit>> {
            Ok(vec![])
        }
    }

    struct FixedWeb(Vec<WebResult>);
    #[async_trait]
    impl PublicKnowledgeSource for FixedWeb {
        async fn search(&self, _query: &str) -> SourceResult<Vec<WebResult>> {
            Ok(self.0.clone())
        }
    }

    fn incident() -> Incident {
        Incident {
            id: "INC-1".into(),
            idempotency_key: None,
            title: Some("checkout 500s".into()),
            affected_service: Some("checkout".into()),
            hypothesis: None,
            symptoms: vec![],
            severity: None,
            status: IncidentStatus::New,
            logs: vec![],
            loki_logs: vec![],
            app_logs: vec![],
            k8s_events: vec![],
            metrics: Metrics::default(),
            git_commits: vec![],
            derived: None,
            overflow: Default::default(),
        }
    }

    #[tokio::test]
    async fn low_confidence_triggers_web_search() {
        let gatherer = Gatherer::new(
            Arc::new(EmptyLogs),
            Arc::new(FixedHistory(vec![])),
            Arc::new(EmptyCodeHistory),
            Arc::new(FixedWeb(vec![WebResult {
                title: "fix".into(),
                url: "https://kubernetes.io/docs/fix".into(),
                snippet: String::new(),
                score: 0.9,
            }])),
            0.8,
        );

        let context = gatherer.gather(&incident()).await;
        assert!(context.web_search_triggered);
        assert_eq!(context.web_knowledge.len(), 1);
    }

    #[tokio::test]
    async fn high_confidence_skips_web_search() {
        let matches = vec![
            SimilarIncident {
                incident_id: "INC-old-1".into(),
                similarity_score: 0.95,
                summary: "same thing".into(),
                metadata: serde_json::Value::Null,
            },
            SimilarIncident {
                incident_id: "INC-old-2".into(),
                similarity_score: 0.9,
                summary: "same thing again".into(),
                metadata: serde_json::Value::Null,
            },
        ];
        let gatherer = Gatherer::new(
            Arc::new(EmptyLogs),
            Arc::new(FixedHistory(matches)),
            Arc::new(EmptyCodeHistory),
            Arc::new(FixedWeb(vec![])),
            0.8,
        );

        let context = gatherer.gather(&incident()).await;
        assert!(!context.web_search_triggered);
        assert!(context.web_knowledge.is_empty());
    }

    #[tokio::test]
    async fn web_results_outside_allowed_domains_are_dropped() {
        let gatherer = Gatherer::new(
            Arc::new(EmptyLogs),
            Arc::new(FixedHistory(vec![])),
            Arc::new(EmptyCodeHistory),
            Arc::new(FixedWeb(vec![WebResult {
                title: "unrelated blog".into(),
                url: "https://random-blog.example.com/post".into(),
                snippet: String::new(),
                score: 0.99,
            }])),
            0.8,
        );

        let context = gatherer.gather(&incident()).await;
        assert!(context.web_knowledge.is_empty());
    }
}
