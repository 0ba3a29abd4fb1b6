use serde::{Deserialize, Serialize};

/// Dotted-name capability exposed by the Sandbox. The allow-list (spec
/// §4.6) is closed: any other tool name must be rejected before dispatch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    #[serde(rename = "shell.run")]
    ShellRun,
    #[serde(rename = "http.request")]
    HttpRequest,
    #[serde(rename = "fs.write")]
    FsWrite,
    #[serde(rename = "compose.run")]
    ComposeRun,
    #[serde(rename = "kubectl.run")]
    KubectlRun,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::ShellRun,
        ToolName::HttpRequest,
        ToolName::FsWrite,
        ToolName::ComposeRun,
        ToolName::KubectlRun,
    ];

    pub fn as_wire_name(&self) -> &'static str {
        match self {
            ToolName::ShellRun => "shell.run",
            ToolName::HttpRequest => "http.request",
            ToolName::FsWrite => "fs.write",
            ToolName::ComposeRun => "compose.run",
            ToolName::KubectlRun => "kubectl.run",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<ToolName> {
        Self::ALL.into_iter().find(|t| t.as_wire_name() == name)
    }

    /// Tools that never accept a `cwd` argument (spec §4.6 step normalization):
    /// `http.request` must not inherit `cwd`, and `kubectl.run` forbids it
    /// outright since it operates on the cluster, not the local filesystem.
    pub fn rejects_cwd(&self) -> bool {
        matches!(self, ToolName::HttpRequest | ToolName::KubectlRun)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire_name())
    }
}

/// One invocation of an allow-listed tool with its arguments. `args` is kept
/// as `serde_json::Value` because each tool defines its own argument shape.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Step {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Proposed,
    Approved,
    Executing,
    Completed,
    Failed,
    Skipped,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a numeric risk score into a display-only risk level. Used
    /// when the caller did not supply `risk_level` explicitly (spec §9
    /// open question: numeric `risk` is authoritative for gating, the enum
    /// is derived from it unless given).
    pub fn from_numeric(risk: f32) -> RiskLevel {
        if risk < 0.34 {
            RiskLevel::Low
        } else if risk < 0.67 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rollout {
    Canary,
    Bluegreen,
    Inplace,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Quick,
    Comprehensive,
    DeepDive,
    Fallback,
}

/// The unit the Actor executes, emitted by the Planner on `plans.proposed`
/// and mutated only by status transitions thereafter (Collaborator, Actor).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Plan {
    pub id: String,
    pub incident_id: String,
    pub status: PlanStatus,

    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub risk: Option<f32>,

    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub rollout: Option<Rollout>,
    #[serde(default)]
    pub verification: Vec<String>,
    #[serde(default)]
    pub rollback_plan: Vec<String>,

    #[serde(default)]
    pub steps: Option<Vec<Step>>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Explicit namespace override for rule-based instruction compilation,
    /// resolving the "multi-environment operation" open question in spec
    /// §9 without guessing from free text.
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,

    #[serde(default)]
    pub plan_type: Option<PlanType>,
    #[serde(default)]
    pub context_sources: Vec<String>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub gathering_time_ms: Option<u64>,

    #[serde(default)]
    pub metadata: serde_json::Value,

    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A human approval decision submitted on the out-of-band approval channel
/// (spec §4.3) for a plan the Collaborator is holding pending review.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApprovalCommand {
    pub plan_id: String,
    pub approved_by: String,
}

impl Plan {
    /// Effective risk level: explicit `risk_level` wins, otherwise derived
    /// from the numeric `risk`, otherwise `Low`.
    pub fn effective_risk_level(&self) -> RiskLevel {
        if let Some(level) = self.risk_level {
            return level;
        }
        RiskLevel::from_numeric(self.risk.unwrap_or(0.0))
    }

    /// Whether `risk_level` and `risk` (when both present) roughly agree,
    /// per the Plan invariant in spec §3.
    pub fn risk_coherent(&self) -> bool {
        match (self.risk_level, self.risk) {
            (Some(level), Some(risk)) => level == RiskLevel::from_numeric(risk),
            _ => true,
        }
    }

    pub fn idempotency_key_for(incident_id: &str, plan_id: &str) -> String {
        format!("{incident_id}:{plan_id}")
    }

    pub fn effective_idempotency_key(&self) -> String {
        self.idempotency_key
            .clone()
            .unwrap_or_else(|| Self::idempotency_key_for(&self.incident_id, &self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_name_wire_round_trip() {
        for tool in ToolName::ALL {
            let json = serde_json::to_string(&tool).unwrap();
            let parsed: ToolName = serde_json::from_str(&json).unwrap();
            assert_eq!(tool, parsed);
            assert_eq!(ToolName::from_wire_name(tool.as_wire_name()), Some(tool));
        }
        assert_eq!(ToolName::from_wire_name("bogus.tool"), None);
    }

    #[test]
    fn risk_level_buckets_match_boundaries() {
        assert_eq!(RiskLevel::from_numeric(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_numeric(0.5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_numeric(0.9), RiskLevel::High);
    }

    #[test]
    fn idempotency_key_defaults_to_incident_and_plan() {
        let plan = Plan {
            id: "plan-1".into(),
            incident_id: "INC-1".into(),
            status: PlanStatus::Approved,
            risk_level: None,
            risk: Some(0.1),
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
        };
        assert_eq!(plan.effective_idempotency_key(), "INC-1:plan-1");
    }
}
