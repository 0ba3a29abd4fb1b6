mod embedder;
mod index;
mod postmortem;
mod summary;

use bus::{topology, AmqpBus, Bus, Delivery};
use chrono::Utc;
use embedder::{Embedder, HttpEmbedder};
use futures_util::StreamExt;
use index::{HistoryIndexWriter, HttpHistoryIndexWriter};
use platform::{DependencyStatus, HealthState};
use postmortem::{HttpPostMortemStore, NoopPostMortemStore, PostMortemStore};
use shared_types::{ErrorCategory, HistoricalIncident, PipelineConfig, Resolution, ResolutionStatus};
use std::net::SocketAddr;
use std::sync::Arc;
use store::Store;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    platform::init_tracing("learner")?;
    if let Err(err) = platform::init_metrics(SocketAddr::from(([0, 0, 0, 0], 9094))) {
        warn!(error = %err, "failed to start metrics exporter, continuing without it");
    }
    let config = PipelineConfig::from_env();

    let amqp = AmqpBus::connect(&config.broker_url).await?;
    amqp.declare_topology().await?;
    let bus: Arc<dyn Bus> = Arc::new(amqp);

    let store = Store::open(&config.store_path)?;
    let embedding_endpoint = std::env::var("EMBEDDING_ENDPOINT").unwrap_or_default();
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(embedding_endpoint, config.embedding_model_id.clone()));
    let index_writer: Arc<dyn HistoryIndexWriter> = Arc::new(HttpHistoryIndexWriter::new(config.history_index_endpoint.clone()));

    let doc_store_endpoint = std::env::var("DOC_STORE_ENDPOINT").unwrap_or_default();
    let doc_store_api_key = std::env::var("DOC_STORE_API_KEY").unwrap_or_default();
    let post_mortems: Arc<dyn PostMortemStore> = if doc_store_endpoint.is_empty() {
        Arc::new(NoopPostMortemStore)
    } else {
        Arc::new(HttpPostMortemStore::new(doc_store_endpoint, doc_store_api_key))
    };

    let health = HealthState::new("learner");
    health.set_dependency("broker", DependencyStatus::Up).await;
    let health_task = tokio::spawn(health.serve(SocketAddr::from(([0, 0, 0, 0], 8084))));

    let mut deliveries = bus.consume(topology::INCIDENTS_RESOLVED, "learner").await?;
    info!("learner listening on q.incidents.resolved");

    while let Some(delivery) = deliveries.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(err) => {
                warn!(error = %err, "failed to pull delivery off the incidents.resolved queue");
                continue;
            }
        };

        match handle_resolved(&delivery, &store, &*embedder, &*index_writer, &*post_mortems).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    error!(error = %err, "failed to ack resolution delivery");
                }
            }
            Err(category) if category.is_retryable() => {
                let _ = delivery.nack_requeue().await;
            }
            Err(_) => {
                let _ = delivery.nack_dead_letter().await;
            }
        }
    }

    health_task.abort();
    Ok(())
}

/// Summarize, embed, and index a resolved incident (spec §4.5). A
/// post-mortem doc-store failure is logged and swallowed rather than
/// propagated, so it never blocks the index update.
async fn handle_resolved(
    delivery: &Delivery,
    store: &Store,
    embedder: &dyn Embedder,
    index_writer: &dyn HistoryIndexWriter,
    post_mortems: &dyn PostMortemStore,
) -> Result<(), ErrorCategory> {
    let resolution: Resolution = delivery.deserialize().map_err(|_| ErrorCategory::ContractViolation)?;
    let span = platform::correlation_span(&resolution.incident_id, "learner.handle_resolved");

    async move {
        let incident = store.get_incident(&resolution.incident_id).await.map_err(|_| ErrorCategory::Fatal)?;
        let plan = store.get_plan(&resolution.plan_id).await.map_err(|_| ErrorCategory::Fatal)?;

        let title = incident.as_ref().and_then(|i| i.title.clone()).unwrap_or_else(|| "Unknown incident".to_string());
        let service = incident.as_ref().and_then(|i| i.affected_service.clone()).unwrap_or_else(|| "unknown".to_string());
        let severity = incident
            .as_ref()
            .and_then(|i| i.severity)
            .map(|s| format!("{s:?}").to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        let hypothesis =
            incident.as_ref().and_then(|i| i.hypothesis.clone()).unwrap_or_else(|| "No hypothesis provided".to_string());
        // No explicit confidence score is persisted on a Plan; inverse risk is
        // the closest available proxy for "how confident was the synthesis".
        let confidence = plan.as_ref().and_then(|p| p.risk).map(|r| 1.0 - r).unwrap_or(0.0);

        let summary_text = summary::build_summary(
            &resolution.incident_id,
            &title,
            &service,
            &severity,
            &hypothesis,
            confidence,
            &resolution,
        );

        let embedding = embedder.embed(&summary_text).await.map_err(|_| ErrorCategory::TransientExternal)?;

        let historical = HistoricalIncident {
            incident_id: resolution.incident_id.clone(),
            embedding,
            summary: summary_text.clone(),
            service: Some(service.clone()),
            severity: Some(severity),
            timestamp: Utc::now(),
            source: "pipeline".to_string(),
            resolution: resolution.resolution_action.clone(),
        };

        index_writer.upsert(&historical).await.map_err(|_| ErrorCategory::TransientExternal)?;
        platform::record_counter("learner_incidents_indexed", 1);

        if resolution.status == ResolutionStatus::Resolved {
            if let Err(err) = post_mortems.create(&resolution.incident_id, &title, &summary_text).await {
                warn!(incident_id = %resolution.incident_id, error = %err, "post-mortem creation failed, continuing");
            }
        }

        Ok(())
    }
    .instrument(span)
    .await
}
