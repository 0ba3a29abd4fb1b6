//! HTTP-backed implementations of the Context Enricher's capability traits.
//! These are the only places the Planner binary speaks to a concrete log
//! store, vector index, VCS host, or search API — the vendor stays behind
//! the interface context::* defines (spec §9's non-goal on concrete vendors).

use async_trait::async_trait;
use context::{CodeHistorySource, HistoryIndexSource, LogsSource, PublicKnowledgeSource, SourceError, SourceResult};
use shared_types::{GitCommit, LogEntry, SimilarIncident, WebResult};

pub struct HttpLogsSource {
    http: reqwest::Client,
}

impl HttpLogsSource {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }
}

#[async_trait]
impl LogsSource for HttpLogsSource {
    async fn recent_logs(&self, service: &str, hours_back: u32) -> SourceResult<Vec<LogEntry>> {
        fetch_logs(&self.http, service, hours_back, false).await
    }

    async fn error_logs(&self, service: &str, hours_back: u32) -> SourceResult<Vec<LogEntry>> {
        fetch_logs(&self.http, service, hours_back, true).await
    }
}

async fn fetch_logs(http: &reqwest::Client, service: &str, hours_back: u32, errors_only: bool) -> SourceResult<Vec<LogEntry>> {
    let endpoint = std::env::var("LOGS_ENDPOINT").unwrap_or_default();
    if endpoint.is_empty() {
        return Ok(vec![]);
    }
    let response = http
        .get(format!("{endpoint}/logs"))
        .query(&[("service", service), ("hours_back", &hours_back.to_string()), ("errors_only", &errors_only.to_string())])
        .send()
        .await?;
    Ok(response.json::<Vec<LogEntry>>().await?)
}

pub struct HttpHistoryIndexSource {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpHistoryIndexSource {
    pub fn new(endpoint: String) -> Self {
        Self { http: reqwest::Client::new(), endpoint }
    }
}

#[async_trait]
impl HistoryIndexSource for HttpHistoryIndexSource {
    async fn knn_query(&self, incident_text: &str, limit: usize) -> SourceResult<Vec<SimilarIncident>> {
        if self.endpoint.is_empty() {
            return Ok(vec![]);
        }
        let response = self
            .http
            .post(format!("{}/query", self.endpoint))
            .json(&serde_json::json!({ "text": incident_text, "limit": limit }))
            .send()
            .await?;
        Ok(response.json::<Vec<SimilarIncident>>().await?)
    }
}

pub struct HttpCodeHistorySource {
    http: reqwest::Client,
    token: String,
}

impl HttpCodeHistorySource {
    pub fn new(token: String) -> Self {
        Self { http: reqwest::Client::new(), token }
    }
}

#[async_trait]
impl CodeHistorySource for HttpCodeHistorySource {
    async fn recent_commits(&self, service: &str, hours_back: u32) -> SourceResult<Vec<GitCommit>> {
        fetch_commits(&self.http, &self.token, service, "commits", hours_back).await
    }

    async fn deployment_history(&self, service: &str, days_back: u32) -> SourceResult<Vec<GitCommit>> {
        fetch_commits(&self.http, &self.token, service, "deployments", days_back).await
    }
}

async fn fetch_commits(http: &reqwest::Client, token: &str, service: &str, kind: &str, window: u32) -> SourceResult<Vec<GitCommit>> {
    let endpoint = std::env::var("CODE_HISTORY_ENDPOINT").unwrap_or_default();
    if endpoint.is_empty() || token.is_empty() {
        return Ok(vec![]);
    }
    let response = http
        .get(format!("{endpoint}/{kind}"))
        .bearer_auth(token)
        .query(&[("service", service), ("window", &window.to_string())])
        .send()
        .await?;
    Ok(response.json::<Vec<GitCommit>>().await?)
}

pub struct HttpPublicKnowledgeSource {
    http: reqwest::Client,
    api_key: String,
}

impl HttpPublicKnowledgeSource {
    pub fn new(api_key: String) -> Self {
        Self { http: reqwest::Client::new(), api_key }
    }
}

#[async_trait]
impl PublicKnowledgeSource for HttpPublicKnowledgeSource {
    async fn search(&self, query: &str) -> SourceResult<Vec<WebResult>> {
        let endpoint = std::env::var("PUBLIC_KNOWLEDGE_ENDPOINT").unwrap_or_default();
        if endpoint.is_empty() || self.api_key.is_empty() {
            return Ok(vec![]);
        }
        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("q", query)])
            .send()
            .await?;
        Ok(response.json::<Vec<WebResult>>().await.map_err(SourceError::from)?)
    }
}
