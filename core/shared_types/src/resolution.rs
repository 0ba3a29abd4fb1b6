use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Resolved,
    Failed,
    Skipped,
}

/// One tool invocation's outcome within a `Resolution`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StepOutput {
    pub step: usize,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutput {
    /// A step output's `result` must at minimum carry `{ok: bool}` per
    /// spec §3; this reads that flag regardless of what else is attached.
    pub fn is_ok(&self) -> bool {
        self.result
            .as_ref()
            .and_then(|r| r.get("ok"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Emitted by the Actor on `incidents.resolved`, terminating an incident's
/// lifecycle from the pipeline's point of view.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Resolution {
    pub incident_id: String,
    pub plan_id: String,
    pub status: ResolutionStatus,
    #[serde(default)]
    pub resolution_action: Option<String>,
    #[serde(default)]
    pub outputs: Vec<StepOutput>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_output_ok_reads_nested_flag() {
        let out = StepOutput {
            step: 0,
            tool: "shell.run".into(),
            result: Some(serde_json::json!({"ok": true, "stdout": "done"})),
            error: None,
        };
        assert!(out.is_ok());

        let failed = StepOutput {
            step: 1,
            tool: "fs.write".into(),
            result: Some(serde_json::json!({"ok": false, "error": "escapes sandbox"})),
            error: None,
        };
        assert!(!failed.is_ok());
    }
}
