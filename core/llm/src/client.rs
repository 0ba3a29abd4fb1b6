use crate::circuit_breaker::CircuitBreaker;
use crate::error::{LlmError, LlmResult};
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoffBuilder};
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// Chat-completion client abstraction. Agents depend on this trait, never on
/// `reqwest` directly, so planning/compilation logic can be unit-tested
/// against [`MockLlmClient`] without network access.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> LlmResult<String>;
    fn model_id(&self) -> &str;
}

/// OpenRouter-compatible `/chat/completions` client (the provider shape the
/// donor's LLM router agent speaks to), wrapped with a process-local circuit
/// breaker and exponential backoff with jitter.
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    breaker: CircuitBreaker,
    max_retries: u32,
}

impl OpenRouterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            breaker: CircuitBreaker::new(3, 60_000),
            max_retries: 3,
        }
    }

    async fn call_once(&self, prompt: &str) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider { status, body });
        }

        let value: serde_json::Value = response.json().await.map_err(LlmError::Request)?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(LlmError::NoJsonObject)
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        if !self.breaker.allow() {
            return Err(LlmError::CircuitOpen);
        }

        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.call_once(prompt).await {
                Ok(text) => {
                    self.breaker.record_success();
                    return Ok(text);
                }
                Err(err) if attempt >= self.max_retries => {
                    self.breaker.record_failure();
                    return Err(err);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "llm call failed, retrying");
                    match backoff.next_backoff() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            self.breaker.record_failure();
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Deterministic in-memory double for planner/compiler unit tests.
pub struct MockLlmClient {
    pub response: String,
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _prompt: &str) -> LlmResult<String> {
        Ok(self.response.clone())
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}
