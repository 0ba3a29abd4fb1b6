use shared_types::Plan;
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local holding pen for plans awaiting an explicit approval
/// command (spec §4.3: "held by the broker until acknowledged by explicit
/// approval events" — the broker holds the message, this holds the plan
/// body so the approval command doesn't need to carry it again).
pub struct PendingApprovals {
    plans: Mutex<HashMap<String, Plan>>,
}

impl PendingApprovals {
    pub fn new() -> Self {
        Self { plans: Mutex::new(HashMap::new()) }
    }

    pub fn hold(&self, plan: Plan) {
        self.plans.lock().expect("pending approvals mutex poisoned").insert(plan.id.clone(), plan);
    }

    /// Remove and return the held plan for `plan_id`, if any is still
    /// pending. Returns `None` both for unknown plans and for plans
    /// already approved and released, making re-approval a no-op.
    pub fn take(&self, plan_id: &str) -> Option<Plan> {
        self.plans.lock().expect("pending approvals mutex poisoned").remove(plan_id)
    }
}

impl Default for PendingApprovals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{PlanStatus, RiskLevel};

    fn plan(id: &str) -> Plan {
        Plan {
            id: id.into(),
            incident_id: "INC-1".into(),
            status: PlanStatus::Proposed,
            risk_level: Some(RiskLevel::High),
            risk: Some(0.9),
            title: None,
            summary: None,
            rationale: None,
            rollout: None,
            verification: vec![],
            rollback_plan: vec![],
            steps: None,
            instructions: None,
            namespace: None,
            idempotency_key: None,
            approved_by: None,
            plan_type: None,
            context_sources: vec![],
            model_used: None,
            gathering_time_ms: None,
            metadata: serde_json::Value::Null,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn second_take_is_a_no_op() {
        let held = PendingApprovals::new();
        held.hold(plan("plan-1"));
        assert!(held.take("plan-1").is_some());
        assert!(held.take("plan-1").is_none());
    }
}
