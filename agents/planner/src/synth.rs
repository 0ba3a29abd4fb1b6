use llm::{extract_json_object, LlmClient};
use shared_types::{EnrichedContext, Incident, Plan, PlanType, RiskLevel, Rollout, Step};
use uuid::Uuid;

/// Build the LLM prompt for a plan. Basic synthesis uses only the incident
/// body; enhanced synthesis also folds in the enriched context (spec §4.1).
pub fn build_prompt(incident: &Incident, plan_type: PlanType, context: Option<&EnrichedContext>) -> String {
    let template = match plan_type {
        PlanType::Quick => "Produce an urgent stabilization plan.",
        PlanType::DeepDive => "Produce a deep-dive plan with timeline and hypothesis analysis.",
        PlanType::Comprehensive | PlanType::Fallback => "Produce a comprehensive remediation plan.",
    };

    let incident_json = serde_json::to_string(incident).unwrap_or_default();
    let mut prompt = format!(
        "{template}\n\nRespond with strict JSON: {{\"title\":string,\"summary\":string,\"rationale\":string,\
        \"risk\":number,\"rollout\":\"canary\"|\"bluegreen\"|\"inplace\",\"verification\":[string],\
        \"rollback_plan\":[string],\"steps\":[{{\"tool\":string,\"args\":object}}]}}\n\nIncident:\n{incident_json}"
    );

    if let Some(context) = context {
        let context_json = serde_json::to_string(context).unwrap_or_default();
        prompt.push_str(&format!("\n\nEnriched context:\n{context_json}"));
    }

    prompt
}

/// Two safe diagnostic steps (health check + log review), `risk_level=low`,
/// `plan_type=fallback`, with an error note in metadata — emitted when the
/// LLM response cannot be parsed after extraction attempts (spec §4.1).
pub fn fallback_plan(incident: &Incident, reason: &str) -> Plan {
    let namespace = "sandbox".to_string();
    Plan {
        id: Uuid::new_v4().to_string(),
        incident_id: incident.id.clone(),
        status: shared_types::PlanStatus::Proposed,
        risk_level: Some(RiskLevel::Low),
        risk: Some(0.0),
        title: Some(format!("Diagnose {}", incident.affected_service.as_deref().unwrap_or("service"))),
        summary: Some("Automated fallback plan: LLM synthesis failed, running safe diagnostics only.".to_string()),
        rationale: Some(reason.to_string()),
        rollout: None,
        verification: vec![],
        rollback_plan: vec![],
        steps: Some(vec![
            Step {
                tool: "kubectl.run".to_string(),
                args: serde_json::json!({ "args": ["get", "pods", "-n", namespace] }),
            },
            Step {
                tool: "shell.run".to_string(),
                args: serde_json::json!({ "cmd": "sh", "args": ["-c", "kubectl logs --tail=200 -n sandbox -l app"] }),
            },
        ]),
        instructions: None,
        namespace: Some(namespace),
        idempotency_key: None,
        approved_by: None,
        plan_type: Some(PlanType::Fallback),
        context_sources: vec![],
        model_used: None,
        gathering_time_ms: None,
        metadata: serde_json::json!({ "error": reason }),
        created_at: None,
        updated_at: None,
    }
}

/// Parse the LLM's JSON response into a `Plan`, accepting either a bare
/// object or one extracted from markdown-fenced text (spec §4.1's LLM
/// contract). Returns `None` on parse failure so the caller can fall back.
pub fn parse_plan_response(incident: &Incident, plan_type: PlanType, model: &str, response: &str) -> Option<Plan> {
    let value = extract_json_object(response)?;

    let title = value.get("title")?.as_str()?.to_string();
    let steps: Option<Vec<Step>> = value
        .get("steps")
        .and_then(|s| serde_json::from_value(s.clone()).ok());

    let rollout = value.get("rollout").and_then(|v| v.as_str()).and_then(|s| match s {
        "canary" => Some(Rollout::Canary),
        "bluegreen" => Some(Rollout::Bluegreen),
        "inplace" => Some(Rollout::Inplace),
        _ => None,
    });

    let risk = value.get("risk").and_then(|v| v.as_f64()).map(|v| v as f32);

    Some(Plan {
        id: Uuid::new_v4().to_string(),
        incident_id: incident.id.clone(),
        status: shared_types::PlanStatus::Proposed,
        risk_level: risk.map(RiskLevel::from_numeric),
        risk,
        title: Some(title),
        summary: value.get("summary").and_then(|v| v.as_str()).map(str::to_string),
        rationale: value.get("rationale").and_then(|v| v.as_str()).map(str::to_string),
        rollout,
        verification: value
            .get("verification")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        rollback_plan: value
            .get("rollback_plan")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        steps,
        instructions: None,
        namespace: None,
        idempotency_key: None,
        approved_by: None,
        plan_type: Some(plan_type),
        context_sources: vec![],
        model_used: Some(model.to_string()),
        gathering_time_ms: None,
        metadata: serde_json::Value::Null,
        created_at: None,
        updated_at: None,
    })
}

/// Synthesize a plan: call the LLM, parse its response, fall back to the
/// deterministic diagnostic plan on any failure.
pub async fn synthesize(
    client: &dyn LlmClient,
    incident: &Incident,
    plan_type: PlanType,
    context: Option<&EnrichedContext>,
) -> Plan {
    let prompt = build_prompt(incident, plan_type, context);
    match client.complete(&prompt).await {
        Ok(response) => match parse_plan_response(incident, plan_type, client.model_id(), &response) {
            Some(plan) => plan,
            None => fallback_plan(incident, "LLM response could not be parsed as a plan"),
        },
        Err(err) => fallback_plan(incident, &format!("LLM call failed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::MockLlmClient;
    use shared_types::{IncidentStatus, Metrics};

    fn incident() -> Incident {
        Incident {
            id: "INC-1".into(),
            idempotency_key: None,
            title: Some("checkout 500s".into()),
            affected_service: Some("checkout".into()),
            hypothesis: None,
            symptoms: vec![],
            severity: None,
            status: IncidentStatus::New,
            logs: vec![],
            loki_logs: vec![],
            app_logs: vec![],
            k8s_events: vec![],
            metrics: Metrics::default(),
            git_commits: vec![],
            derived: None,
            overflow: Default::default(),
        }
    }

    #[tokio::test]
    async fn valid_json_response_produces_a_plan() {
        let client = MockLlmClient {
            response: r#"{"title":"Restart checkout","summary":"s","rationale":"r","risk":0.2,
                "rollout":"canary","verification":[],"rollback_plan":[],
                "steps":[{"tool":"kubectl.run","args":{"args":["get","pods"]}}]}"#
                .to_string(),
        };
        let plan = synthesize(&client, &incident(), PlanType::Comprehensive, None).await;
        assert_eq!(plan.title.as_deref(), Some("Restart checkout"));
        assert_eq!(plan.plan_type, Some(PlanType::Comprehensive));
    }

    #[tokio::test]
    async fn unparseable_response_falls_back_to_diagnostic_plan() {
        let client = MockLlmClient { response: "I cannot help with that.".to_string() };
        let plan = synthesize(&client, &incident(), PlanType::Comprehensive, None).await;
        assert_eq!(plan.plan_type, Some(PlanType::Fallback));
        assert_eq!(plan.risk_level, Some(RiskLevel::Low));
    }
}
