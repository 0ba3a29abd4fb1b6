use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Liveness of a single dependency (broker, store, LLM endpoint, ...) as
/// last observed by the agent's own calls against it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
    Unknown,
}

/// Process-wide health state an agent updates as it discovers dependency
/// failures, surfaced on `/healthz` per spec §6 ("each agent exposes a
/// health endpoint returning component liveness plus dependency status").
#[derive(Clone)]
pub struct HealthState {
    component: &'static str,
    dependencies: Arc<RwLock<HashMap<String, DependencyStatus>>>,
}

#[derive(Serialize)]
struct HealthResponse {
    component: &'static str,
    status: &'static str,
    dependencies: HashMap<String, DependencyStatus>,
}

impl HealthState {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            dependencies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn set_dependency(&self, name: &str, status: DependencyStatus) {
        self.dependencies.write().await.insert(name.to_string(), status);
    }

    async fn snapshot(&self) -> HealthResponse {
        let dependencies = self.dependencies.read().await.clone();
        let overall = if dependencies.values().any(|s| *s == DependencyStatus::Down) {
            "degraded"
        } else {
            "ok"
        };
        HealthResponse {
            component: self.component,
            status: overall,
            dependencies,
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .route("/metrics", get(|| async { "" }))
            .with_state(self)
    }

    /// Bind and serve the health router until the process shuts down. Meant
    /// to be spawned as its own task alongside the agent's message loop.
    pub async fn serve(self, addr: SocketAddr) -> std::io::Result<()> {
        let router = self.router();
        axum::Server::bind(&addr)
            .serve(router.into_make_service())
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

async fn healthz(
    axum::extract::State(state): axum::extract::State<HealthState>,
) -> Json<serde_json::Value> {
    let snapshot = state.snapshot().await;
    Json(serde_json::json!(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn degraded_when_any_dependency_down() {
        let state = HealthState::new("planner");
        state.set_dependency("broker", DependencyStatus::Up).await;
        assert_eq!(state.snapshot().await.status, "ok");

        state.set_dependency("llm", DependencyStatus::Down).await;
        assert_eq!(state.snapshot().await.status, "degraded");
    }
}
