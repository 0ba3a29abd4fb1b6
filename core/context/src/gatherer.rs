use crate::confidence::{internal_confidence, should_trigger_web_search};
use crate::query::{derive_queries, is_allowed_domain};
use crate::sources::{CodeHistorySource, HistoryIndexSource, LogsSource, PublicKnowledgeSource};
use shared_types::{ContextSource, EnrichedContext, GitCommit, Incident, LogEntry, WebResult};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

const LOGS_CAP: usize = 1500;
const HISTORY_MATCH_CAP: usize = 5;
const HISTORY_SIMILARITY_FLOOR: f32 = 0.7;
const CODE_HISTORY_CAP: usize = 15;
const WEB_RESULT_CAP: usize = 10;
const LOGS_HOURS_BACK: u32 = 2;
const CODE_HISTORY_HOURS_BACK: u32 = 24;
const CODE_HISTORY_DEPLOYMENT_DAYS_BACK: u32 = 7;

pub struct Gatherer {
    logs: Arc<dyn LogsSource>,
    history: Arc<dyn HistoryIndexSource>,
    code_history: Arc<dyn CodeHistorySource>,
    web: Arc<dyn PublicKnowledgeSource>,
    confidence_threshold: f32,
}

impl Gatherer {
    pub fn new(
        logs: Arc<dyn LogsSource>,
        history: Arc<dyn HistoryIndexSource>,
        code_history: Arc<dyn CodeHistorySource>,
        web: Arc<dyn PublicKnowledgeSource>,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            logs,
            history,
            code_history,
            web,
            confidence_threshold,
        }
    }

    /// Assemble an `EnrichedContext` per spec §4.2: Logs, HistoryIndex, and
    /// CodeHistory always gather in parallel with per-source error capture;
    /// PublicKnowledge is gated on internal confidence.
    pub async fn gather(&self, incident: &Incident) -> EnrichedContext {
        let start = Instant::now();
        let mut context = EnrichedContext::default();
        let service = incident.affected_service.as_deref().unwrap_or("unknown");
        let incident_text = incident_text_for_embedding(incident);

        let (logs_result, history_result, code_result) = tokio::join!(
            self.gather_logs(service),
            self.gather_history(&incident_text),
            self.gather_code_history(service),
        );

        match logs_result {
            Ok(logs) => context.loki_logs = logs,
            Err(err) => {
                context.gathering_errors.insert(ContextSource::Logs, err);
            }
        }
        context.mark_used(ContextSource::Logs);

        match history_result {
            Ok(matches) => context.similar_incidents = matches,
            Err(err) => {
                context.gathering_errors.insert(ContextSource::HistoryIndex, err);
            }
        }
        context.mark_used(ContextSource::HistoryIndex);

        match code_result {
            Ok(commits) => context.recent_commits = commits,
            Err(err) => {
                context.gathering_errors.insert(ContextSource::CodeHistory, err);
            }
        }
        context.mark_used(ContextSource::CodeHistory);

        context.internal_confidence = internal_confidence(&context.similar_incidents);

        if should_trigger_web_search(context.internal_confidence, self.confidence_threshold, &context.similar_incidents) {
            context.web_search_triggered = true;
            context.web_search_reason = format!(
                "internal confidence {:.3} below threshold {:.3} ({} similar incidents)",
                context.internal_confidence,
                self.confidence_threshold,
                context.similar_incidents.len()
            );
            match self.gather_web(incident).await {
                Ok(results) => {
                    context.web_knowledge = results;
                    context.mark_used(ContextSource::PublicKnowledge);
                }
                Err(err) => {
                    context.gathering_errors.insert(ContextSource::PublicKnowledge, err);
                }
            }
        } else {
            context.web_search_triggered = false;
            context.web_search_reason = format!(
                "internal confidence {:.3} meets threshold {:.3}",
                context.internal_confidence, self.confidence_threshold
            );
        }

        context.gathering_time_ms = start.elapsed().as_millis() as u64;
        context
    }

    async fn gather_logs(&self, service: &str) -> Result<Vec<LogEntry>, String> {
        let recent = self
            .logs
            .recent_logs(service, LOGS_HOURS_BACK)
            .await
            .map_err(|e| e.0)?;
        let errors = self
            .logs
            .error_logs(service, LOGS_HOURS_BACK)
            .await
            .map_err(|e| e.0)?;

        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(recent.len() + errors.len());
        for log in recent.into_iter().chain(errors) {
            let key = (log.timestamp.clone(), log.message.clone());
            if seen.insert(key) {
                merged.push(log);
            }
            if merged.len() >= LOGS_CAP {
                break;
            }
        }
        Ok(merged)
    }

    async fn gather_history(&self, incident_text: &str) -> Result<Vec<shared_types::SimilarIncident>, String> {
        let mut matches = self
            .history
            .knn_query(incident_text, HISTORY_MATCH_CAP)
            .await
            .map_err(|e| e.0)?;
        matches.retain(|m| m.similarity_score >= HISTORY_SIMILARITY_FLOOR);
        matches.sort_by(|a, b| b.similarity_score.partial_cmp(&a.similarity_score).unwrap());
        matches.truncate(HISTORY_MATCH_CAP);
        Ok(matches)
    }

    async fn gather_code_history(&self, service: &str) -> Result<Vec<GitCommit>, String> {
        let recent = self
            .code_history
            .recent_commits(service, CODE_HISTORY_HOURS_BACK)
            .await
            .map_err(|e| e.0)?;
        let deployments = self
            .code_history
            .deployment_history(service, CODE_HISTORY_DEPLOYMENT_DAYS_BACK)
            .await
            .map_err(|e| e.0)?;

        let mut seen = HashSet::new();
        let mut merged: Vec<GitCommit> = Vec::new();
        for commit in recent.into_iter().chain(deployments) {
            if seen.insert(commit.sha.clone()) {
                merged.push(commit);
            }
        }
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        merged.truncate(CODE_HISTORY_CAP);
        Ok(merged)
    }

    async fn gather_web(&self, incident: &Incident) -> Result<Vec<WebResult>, String> {
        let queries = derive_queries(incident);
        let mut seen_urls = HashSet::new();
        let mut results = Vec::new();
        for query in &queries {
            match self.web.search(query).await {
                Ok(found) => results.extend(found),
                Err(err) => return Err(err.0),
            }
        }

        results.retain(|r| is_allowed_domain(&r.url));
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut deduped = Vec::new();
        for result in results {
            if seen_urls.insert(result.url.clone()) {
                deduped.push(result);
            }
            if deduped.len() >= WEB_RESULT_CAP {
                break;
            }
        }
        Ok(deduped)
    }
}

fn incident_text_for_embedding(incident: &Incident) -> String {
    let mut parts = Vec::new();
    if let Some(title) = &incident.title {
        parts.push(title.clone());
    }
    if let Some(service) = &incident.affected_service {
        parts.push(service.clone());
    }
    parts.extend(incident.symptoms.iter().cloned());
    if let Some(hypothesis) = &incident.hypothesis {
        parts.push(hypothesis.clone());
    }
    parts.join(" ")
}
