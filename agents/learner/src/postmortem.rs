use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum DocStoreError {
    #[error("post-mortem request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Optional post-mortem document store (spec §4.5 step 3), grounded on the
/// donor's Notion integration, generalized to an HTTP doc-creation
/// endpoint so the concrete vendor stays out of scope (spec §9).
#[async_trait]
pub trait PostMortemStore: Send + Sync {
    async fn create(&self, incident_id: &str, title: &str, body: &str) -> Result<(), DocStoreError>;
}

pub struct HttpPostMortemStore {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpPostMortemStore {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self { http: reqwest::Client::new(), endpoint, api_key }
    }
}

#[async_trait]
impl PostMortemStore for HttpPostMortemStore {
    async fn create(&self, incident_id: &str, title: &str, body: &str) -> Result<(), DocStoreError> {
        if self.endpoint.is_empty() {
            return Ok(());
        }
        self.http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "incident_id": incident_id, "title": title, "body": body }))
            .send()
            .await?;
        Ok(())
    }
}

/// Post-mortem store that is never configured. Used when no doc-store
/// endpoint is set so the Learner's pipeline stays uniform.
pub struct NoopPostMortemStore;

#[async_trait]
impl PostMortemStore for NoopPostMortemStore {
    async fn create(&self, _incident_id: &str, _title: &str, _body: &str) -> Result<(), DocStoreError> {
        Ok(())
    }
}
