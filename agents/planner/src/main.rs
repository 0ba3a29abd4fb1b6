mod cache;
mod normalize;
mod plan_type;
mod quota;
mod synth;

use bus::{topology, AmqpBus, Bus};
use cache::PlanCache;
use context::{CodeHistorySource, Gatherer, HistoryIndexSource, LogsSource, PublicKnowledgeSource};
use futures_util::StreamExt;
use llm::{LlmClient, OpenRouterClient};
use platform::{DependencyStatus, HealthState};
use quota::{Priority, QuotaManager};
use shared_types::{ContextSource, Incident, Plan, PipelineConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use store::Store;
use tokio::sync::Semaphore;
use tracing::{error, info, warn, Instrument};

mod sources;

/// Bounds the number of incidents this process handles at once, grounded
/// in the donor orchestrator's `AGENT_CONCURRENCY` semaphore.
const IN_FLIGHT_LIMIT: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    platform::init_tracing("planner")?;
    if let Err(err) = platform::init_metrics(SocketAddr::from(([0, 0, 0, 0], 9091))) {
        warn!(error = %err, "failed to start metrics exporter, continuing without it");
    }
    let config = PipelineConfig::from_env();

    let amqp = AmqpBus::connect(&config.broker_url).await?;
    amqp.declare_topology().await?;
    let bus: Arc<dyn Bus> = Arc::new(amqp);

    let store = Store::open(&config.store_path)?;
    let llm_client: Arc<dyn LlmClient> =
        Arc::new(OpenRouterClient::new(config.llm_endpoint.clone(), config.llm_api_key.clone(), config.llm_model.clone()));

    let gatherer = Arc::new(Gatherer::new(
        Arc::new(sources::HttpLogsSource::new()) as Arc<dyn LogsSource>,
        Arc::new(sources::HttpHistoryIndexSource::new(config.history_index_endpoint.clone())) as Arc<dyn HistoryIndexSource>,
        Arc::new(sources::HttpCodeHistorySource::new(config.code_history_token.clone())) as Arc<dyn CodeHistorySource>,
        Arc::new(sources::HttpPublicKnowledgeSource::new(config.public_knowledge_key.clone())) as Arc<dyn PublicKnowledgeSource>,
        config.confidence_threshold,
    ));

    let quota = Arc::new(QuotaManager::new(config.daily_quota, config.hourly_quota));
    let cache = Arc::new(PlanCache::new());

    let health = HealthState::new("planner");
    health.set_dependency("broker", DependencyStatus::Up).await;
    let health_task = tokio::spawn(health.clone().serve(SocketAddr::from(([0, 0, 0, 0], 8081))));

    let mut deliveries = bus.consume(topology::INCIDENTS_NEW, "planner").await?;
    let in_flight = Arc::new(Semaphore::new(IN_FLIGHT_LIMIT));
    info!("planner listening on q.incidents.new");

    while let Some(delivery) = deliveries.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(err) => {
                warn!(error = %err, "failed to pull delivery off the incidents.new queue");
                continue;
            }
        };

        let permit = in_flight.clone().acquire_owned().await.expect("in-flight semaphore closed");
        let bus = bus.clone();
        let store = store.clone();
        let llm_client = llm_client.clone();
        let gatherer = gatherer.clone();
        let quota = quota.clone();
        let cache = cache.clone();
        let critical_services = config.critical_services.clone();

        tokio::spawn(async move {
            let _permit = permit;
            match handle_incident(&delivery, &bus, &store, &*llm_client, &gatherer, &quota, &cache, &critical_services).await {
                Ok(()) => {
                    if let Err(err) = delivery.ack().await {
                        error!(error = %err, "failed to ack incident delivery");
                    }
                }
                Err(category) if category.is_retryable() => {
                    warn!("transient failure handling incident, requeuing");
                    let _ = delivery.nack_requeue().await;
                }
                Err(_) => {
                    warn!("non-retryable failure handling incident, dead-lettering");
                    let _ = delivery.nack_dead_letter().await;
                }
            }
        });
    }

    health_task.abort();
    Ok(())
}

/// Handle one incident end to end: normalize, enrich, decide plan type,
/// synthesize (cached / quota-gated), persist, and publish to
/// `plans.proposed` (spec §4.1's Planner pipeline).
async fn handle_incident(
    delivery: &bus::Delivery,
    bus: &Arc<dyn Bus>,
    store: &Store,
    llm_client: &dyn LlmClient,
    gatherer: &Gatherer,
    quota: &QuotaManager,
    cache: &PlanCache,
    critical_services: &[String],
) -> Result<(), shared_types::ErrorCategory> {
    let mut incident: Incident = delivery.deserialize().map_err(|_| shared_types::ErrorCategory::ContractViolation)?;
    normalize::normalize(&mut incident);
    let correlation_id = incident.id.clone();
    let start = Instant::now();

    let span = platform::correlation_span(&correlation_id, "planner.handle_incident");
    let result = async move {
        let title = incident.title.clone().unwrap_or_default();
        let service = incident.affected_service.clone().unwrap_or_default();
        if let Some(cached) = cache.get(&incident.id, &title, &service) {
            info!(incident_id = %incident.id, "serving cached plan");
            publish_plan(bus, store, &cached).await?;
            return Ok(());
        }

        let derived = incident.derived.clone().unwrap_or_default();
        let plan_type = plan_type::select_plan_type(&derived);
        let wants_enhanced =
            plan_type::wants_enhanced_synthesis(&derived, incident.affected_service.as_deref(), critical_services);

        let context = if wants_enhanced && quota.can_make_request(priority_for(&derived)) {
            quota.record_request();
            Some(gatherer.gather(&incident).await)
        } else {
            None
        };

        let mut plan = synth::synthesize(llm_client, &incident, plan_type, context.as_ref()).await;
        plan.incident_id = incident.id.clone();
        if let Some(context) = &context {
            plan.context_sources = context.sources_used.iter().map(ContextSource::to_string).collect();
            plan.gathering_time_ms = Some(context.gathering_time_ms);
        }

        cache.put(&incident.id, &title, &service, plan.clone());
        publish_plan(bus, store, &plan).await?;
        Ok(())
    }
    .instrument(span)
    .await;

    platform::record_counter("planner_incidents_processed", 1);
    platform::record_histogram("planner_synthesis_duration_seconds", start.elapsed().as_secs_f64());
    result
}

fn priority_for(derived: &shared_types::DerivedFields) -> Priority {
    match derived.severity {
        shared_types::Severity::High => Priority::High,
        shared_types::Severity::Medium => Priority::Normal,
        shared_types::Severity::Low => Priority::Low,
    }
}

async fn publish_plan(bus: &Arc<dyn Bus>, store: &Store, plan: &Plan) -> Result<(), shared_types::ErrorCategory> {
    store.upsert_plan(plan).await.map_err(|_| shared_types::ErrorCategory::Fatal)?;
    bus::publish_json(bus.as_ref(), topology::PLANS_PROPOSED.exchange, topology::PLANS_PROPOSED.routing_key, plan)
        .await
        .map_err(|e| e.category())?;
    Ok(())
}
