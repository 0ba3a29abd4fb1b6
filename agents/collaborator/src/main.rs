mod hold;
mod policy;

use bus::{topology, AmqpBus, Bus, Delivery};
use futures_util::StreamExt;
use hold::PendingApprovals;
use platform::{DependencyStatus, HealthState};
use policy::ApprovalPolicy;
use shared_types::{ApprovalCommand, ErrorCategory, Plan, PlanStatus, PipelineConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use store::Store;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    platform::init_tracing("collaborator")?;
    if let Err(err) = platform::init_metrics(SocketAddr::from(([0, 0, 0, 0], 9092))) {
        warn!(error = %err, "failed to start metrics exporter, continuing without it");
    }
    let config = PipelineConfig::from_env();

    let amqp = AmqpBus::connect(&config.broker_url).await?;
    amqp.declare_topology().await?;
    let bus: Arc<dyn Bus> = Arc::new(amqp);

    let store = Store::open(&config.store_path)?;
    let policy = Arc::new(ApprovalPolicy::default_policy());
    let pending = Arc::new(PendingApprovals::new());

    let health = HealthState::new("collaborator");
    health.set_dependency("broker", DependencyStatus::Up).await;
    let health_task = tokio::spawn(health.serve(SocketAddr::from(([0, 0, 0, 0], 8082))));

    let proposed_task = tokio::spawn(run_proposed_loop(bus.clone(), store.clone(), policy, pending.clone()));
    let approval_task = tokio::spawn(run_approval_command_loop(bus.clone(), store.clone(), pending));

    proposed_task.await??;
    approval_task.await??;
    health_task.abort();
    Ok(())
}

async fn run_proposed_loop(
    bus: Arc<dyn Bus>,
    store: Store,
    policy: Arc<ApprovalPolicy>,
    pending: Arc<PendingApprovals>,
) -> anyhow::Result<()> {
    let mut deliveries = bus.consume(topology::PLANS_PROPOSED, "collaborator").await?;
    info!("collaborator listening on q.plans.proposed");

    while let Some(delivery) = deliveries.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(err) => {
                warn!(error = %err, "failed to pull delivery off the plans.proposed queue");
                continue;
            }
        };

        match handle_proposed(&delivery, &bus, &store, &policy, &pending).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    error!(error = %err, "failed to ack proposed-plan delivery");
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
    Ok(())
}

async fn handle_proposed(
    delivery: &Delivery,
    bus: &Arc<dyn Bus>,
    store: &Store,
    policy: &ApprovalPolicy,
    pending: &PendingApprovals,
) -> Result<(), ErrorCategory> {
    let plan: Plan = delivery.deserialize().map_err(|_| ErrorCategory::ContractViolation)?;
    let span = platform::correlation_span(&plan.id, "collaborator.handle_proposed");

    async move {
        if policy.auto_approves(plan.effective_risk_level()) {
            platform::record_counter("collaborator_plans_auto_approved", 1);
            approve_and_publish(bus, store, plan, "collaborator:auto-approve".to_string()).await
        } else {
            info!(plan_id = %plan.id, "holding plan for explicit approval");
            platform::record_counter("collaborator_plans_held", 1);
            pending.hold(plan);
            Ok(())
        }
    }
    .instrument(span)
    .await
}

async fn run_approval_command_loop(bus: Arc<dyn Bus>, store: Store, pending: Arc<PendingApprovals>) -> anyhow::Result<()> {
    let mut deliveries = bus.consume(topology::PLANS_APPROVAL_COMMAND, "collaborator").await?;
    info!("collaborator listening on q.plans.approval_command");

    while let Some(delivery) = deliveries.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(err) => {
                warn!(error = %err, "failed to pull delivery off the approval_command queue");
                continue;
            }
        };

        match handle_approval_command(&delivery, &bus, &store, &pending).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    error!(error = %err, "failed to ack approval command delivery");
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
    Ok(())
}

async fn handle_approval_command(
    delivery: &Delivery,
    bus: &Arc<dyn Bus>,
    store: &Store,
    pending: &PendingApprovals,
) -> Result<(), ErrorCategory> {
    let command: ApprovalCommand = delivery.deserialize().map_err(|_| ErrorCategory::ContractViolation)?;
    let span = platform::correlation_span(&command.plan_id, "collaborator.handle_approval_command");

    async move {
        match pending.take(&command.plan_id) {
            Some(plan) => {
                platform::record_counter("collaborator_plans_approved_by_command", 1);
                approve_and_publish(bus, store, plan, command.approved_by).await
            }
            None => {
                info!(plan_id = %command.plan_id, "approval command for unknown or already-approved plan, ignoring");
                Ok(())
            }
        }
    }
    .instrument(span)
    .await
}

async fn approve_and_publish(bus: &Arc<dyn Bus>, store: &Store, mut plan: Plan, approved_by: String) -> Result<(), ErrorCategory> {
    plan.status = PlanStatus::Approved;
    plan.approved_by = Some(approved_by);

    store.upsert_plan(&plan).await.map_err(|_| ErrorCategory::Fatal)?;
    bus::publish_json(bus.as_ref(), topology::PLANS_APPROVED.exchange, topology::PLANS_APPROVED.routing_key, &plan)
        .await
        .map_err(|e| e.category())?;
    Ok(())
}
