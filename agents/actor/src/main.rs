mod seen;

use bus::{topology, AmqpBus, Bus, Delivery};
use futures_util::StreamExt;
use llm::{LlmClient, OpenRouterClient};
use platform::{DependencyStatus, HealthState};
use sandbox::{compiler, Sandbox};
use seen::SeenSet;
use shared_types::{ErrorCategory, Plan, PlanStatus, PipelineConfig, Resolution, ResolutionStatus, StepOutput};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use store::Store;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    platform::init_tracing("actor")?;
    if let Err(err) = platform::init_metrics(SocketAddr::from(([0, 0, 0, 0], 9093))) {
        warn!(error = %err, "failed to start metrics exporter, continuing without it");
    }
    let config = PipelineConfig::from_env();

    let amqp = AmqpBus::connect(&config.broker_url).await?;
    amqp.declare_topology().await?;
    let bus: Arc<dyn Bus> = Arc::new(amqp);

    let store = Store::open(&config.store_path)?;
    let llm_client: Arc<dyn LlmClient> =
        Arc::new(OpenRouterClient::new(config.llm_endpoint.clone(), config.llm_api_key.clone(), config.llm_model.clone()));
    let sandbox = Arc::new(Sandbox::new(config.sandbox_root.clone(), config.allowed_commands.clone()));
    let seen = Arc::new(SeenSet::new());

    let health = HealthState::new("actor");
    health.set_dependency("broker", DependencyStatus::Up).await;
    let health_task = tokio::spawn(health.serve(SocketAddr::from(([0, 0, 0, 0], 8083))));

    let mut deliveries = bus.consume(topology::PLANS_APPROVED, "actor").await?;
    info!("actor listening on q.plans.approved");

    while let Some(delivery) = deliveries.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(err) => {
                warn!(error = %err, "failed to pull delivery off the plans.approved queue");
                continue;
            }
        };

        match handle_approved(&delivery, &bus, &store, &*llm_client, &sandbox, &seen, &config).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    error!(error = %err, "failed to ack approved-plan delivery");
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

async fn handle_approved(
    delivery: &Delivery,
    bus: &Arc<dyn Bus>,
    store: &Store,
    llm_client: &dyn LlmClient,
    sandbox: &Sandbox,
    seen: &SeenSet,
    config: &PipelineConfig,
) -> Result<(), ErrorCategory> {
    let plan: Plan = delivery.deserialize().map_err(|_| ErrorCategory::ContractViolation)?;
    let start = Instant::now();
    let span = platform::correlation_span(&plan.id, "actor.handle_approved");

    async move {
        // Gate 1: idempotency.
        let idempotency_key = plan.effective_idempotency_key();
        if !seen.observe(&idempotency_key) {
            info!(plan_id = %plan.id, "duplicate approved plan, dropping");
            return Ok(());
        }

        // Gate 2: autonomy ceiling.
        let risk = plan.risk.unwrap_or(0.0);
        if risk > config.max_autonomy_risk {
            warn!(plan_id = %plan.id, risk, ceiling = config.max_autonomy_risk, "plan exceeds autonomy ceiling, skipping");
            let outputs = vec![StepOutput {
                step: 0,
                tool: "autonomy".to_string(),
                result: Some(serde_json::json!({ "ok": false })),
                error: Some(format!("risk {risk} > max {}", config.max_autonomy_risk)),
            }];
            return finish(bus, store, &plan, PlanStatus::Skipped, ResolutionStatus::Skipped, outputs, start).await;
        }

        // Gate 3: instruction compilation, if steps are not already present.
        let steps = match &plan.steps {
            Some(steps) => steps.clone(),
            None => {
                let instructions = match &plan.instructions {
                    Some(text) => text.clone(),
                    None => {
                        warn!(plan_id = %plan.id, "plan has neither steps nor instructions");
                        return finish(bus, store, &plan, PlanStatus::Failed, ResolutionStatus::Failed, vec![], start).await;
                    }
                };
                match compiler::rule_based_compile(&instructions, plan.namespace.as_deref(), &config.default_namespace) {
                    Some(steps) => steps,
                    None => match compiler::llm_compile(llm_client, &instructions).await {
                        Ok(steps) => steps,
                        Err(err) => {
                            warn!(plan_id = %plan.id, error = %err, "instruction compilation failed, marking plan failed");
                            return finish(bus, store, &plan, PlanStatus::Failed, ResolutionStatus::Failed, vec![], start).await;
                        }
                    },
                }
            }
        };

        // Execution: sequential, stop on first failure.
        let mut outputs = Vec::with_capacity(steps.len());
        let mut failed = false;
        for (index, step) in steps.iter().enumerate() {
            let result = sandbox.execute(step).await;
            let ok = result.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
            outputs.push(StepOutput { step: index, tool: step.tool.clone(), result: Some(result), error: None });
            if !ok {
                failed = true;
                break;
            }
        }

        let (plan_status, resolution_status) = if failed {
            (PlanStatus::Failed, ResolutionStatus::Failed)
        } else {
            (PlanStatus::Completed, ResolutionStatus::Resolved)
        };

        finish(bus, store, &plan, plan_status, resolution_status, outputs, start).await
    }
    .instrument(span)
    .await
}

async fn finish(
    bus: &Arc<dyn Bus>,
    store: &Store,
    plan: &Plan,
    plan_status: PlanStatus,
    resolution_status: ResolutionStatus,
    outputs: Vec<StepOutput>,
    start: Instant,
) -> Result<(), ErrorCategory> {
    let mut updated_plan = plan.clone();
    updated_plan.status = plan_status;
    store.upsert_plan(&updated_plan).await.map_err(|_| ErrorCategory::Fatal)?;

    let resolution = Resolution {
        incident_id: plan.incident_id.clone(),
        plan_id: plan.id.clone(),
        status: resolution_status,
        resolution_action: plan.title.clone(),
        outputs,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    store.insert_resolution(&resolution).await.map_err(|_| ErrorCategory::Fatal)?;

    let outcome_metric = match plan_status {
        PlanStatus::Completed => "actor_plans_completed",
        PlanStatus::Failed => "actor_plans_failed",
        PlanStatus::Skipped => "actor_plans_skipped",
        _ => "actor_plans_other",
    };
    platform::record_counter(outcome_metric, 1);
    platform::record_histogram("actor_execution_duration_seconds", start.elapsed().as_secs_f64());

    bus::publish_json(
        bus.as_ref(),
        topology::INCIDENTS_RESOLVED.exchange,
        topology::INCIDENTS_RESOLVED.routing_key,
        &resolution,
    )
    .await
    .map_err(|e| e.category())?;
    Ok(())
}
