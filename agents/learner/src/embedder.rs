use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Text-to-vector capability, kept vendor-agnostic per spec §9 (the
/// embedding model is a replaceable interface, not a hard dependency).
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;
}

/// HTTP embedding service client. Posts `{"text": ...}`, expects
/// `{"embedding": [f32, ...]}` back.
pub struct HttpEmbedder {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(endpoint: String, model: String) -> Self {
        Self { http: reqwest::Client::new(), endpoint, model }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        if self.endpoint.is_empty() {
            return Ok(vec![]);
        }
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": text, "model": self.model }))
            .send()
            .await?;
        let body: serde_json::Value = response.json().await?;
        Ok(body["embedding"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            .unwrap_or_default())
    }
}
