use llm::{extract_json_object, LlmClient};
use once_cell::sync::Lazy;
use regex::Regex;
use shared_types::{Step, ToolName};

static RESTART_DEPLOYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"restart .*deployment\s+(\S+)").expect("valid regex"));
static SCALE_DEPLOYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"scale .*deployment\s+(\S+).*(?:to|=)\s*(\d+)").expect("valid regex"));
static TRAILING_NAMESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"in (?:the )?([a-z0-9-]+)(?:\s+namespace)?\s*$").expect("valid regex"));

/// Resolves the namespace a compiled step should target. An explicit
/// `Plan.namespace` always wins; otherwise a trailing `in <namespace>` /
/// `in the <namespace> namespace` clause on the instruction is used (spec
/// §8 scenario 2); otherwise the caller's configured default.
fn resolve_namespace(text: &str, explicit_namespace: Option<&str>, default_namespace: &str) -> String {
    if let Some(namespace) = explicit_namespace {
        return namespace.to_string();
    }
    TRAILING_NAMESPACE
        .captures(text)
        .map(|captures| captures[1].to_string())
        .unwrap_or_else(|| default_namespace.to_string())
}

/// Deterministic rule-based compiler for common operations (spec §4.4):
/// restart/scale of a named deployment, wrapped through the shell rather
/// than invoked via `kubectl.run` directly, per the literal example in the
/// pipeline's end-to-end scenarios.
pub fn rule_based_compile(instructions: &str, explicit_namespace: Option<&str>, default_namespace: &str) -> Option<Vec<Step>> {
    let text = instructions.to_lowercase();
    let namespace = resolve_namespace(&text, explicit_namespace, default_namespace);

    if let Some(captures) = RESTART_DEPLOYMENT.captures(&text) {
        let deployment = &captures[1];
        return Some(vec![
            shell_step(&format!("kubectl rollout restart deployment/{deployment} -n {namespace}")),
            shell_step(&format!("kubectl rollout status deployment/{deployment} -n {namespace}")),
        ]);
    }

    if let Some(captures) = SCALE_DEPLOYMENT.captures(&text) {
        let deployment = &captures[1];
        let replicas = &captures[2];
        return Some(vec![
            shell_step(&format!(
                "kubectl scale deployment/{deployment} --replicas={replicas} -n {namespace}"
            )),
            shell_step(&format!("kubectl rollout status deployment/{deployment} -n {namespace}")),
        ]);
    }

    None
}

fn shell_step(command: &str) -> Step {
    Step {
        tool: ToolName::ShellRun.as_wire_name().to_string(),
        args: serde_json::json!({ "cmd": "sh", "args": ["-c", command] }),
    }
}

/// LLM compile pass: instructs the model to return `{"steps": [...]}` and
/// validates every step's tool against the allow-list before returning,
/// per spec §4.4's "if both fail, mark the plan failed".
pub async fn llm_compile(
    client: &dyn LlmClient,
    instructions: &str,
) -> Result<Vec<Step>, String> {
    let prompt = format!(
        "Convert the following operational instruction into JSON of the shape \
         {{\"steps\":[{{\"tool\":string,\"args\":object}}]}} using only these tools: \
         shell.run, http.request, fs.write, compose.run, kubectl.run. \
         Output only the JSON object.\n\nInstruction: {instructions}"
    );

    let response = client.complete(&prompt).await.map_err(|e| e.to_string())?;
    let value = extract_json_object(&response).ok_or("no JSON object in LLM response")?;

    let steps_value = value
        .get("steps")
        .and_then(|s| s.as_array())
        .ok_or("LLM response missing \"steps\" array")?;

    let mut steps = Vec::with_capacity(steps_value.len());
    for raw in steps_value {
        let step: Step = serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
        if ToolName::from_wire_name(&step.tool).is_none() {
            return Err(format!("LLM compiled a non-allow-listed tool: {}", step.tool));
        }
        steps.push(step);
    }

    if steps.is_empty() {
        return Err("LLM compiled zero steps".to_string());
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_pattern_compiles_two_shell_steps() {
        let steps = rule_based_compile("Restart the hello deployment in sandbox namespace", None, "sandbox").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].tool, "shell.run");
        assert!(steps[0].args["args"][1].as_str().unwrap().contains("rollout restart deployment/hello"));
        assert!(steps[1].args["args"][1].as_str().unwrap().contains("rollout status deployment/hello"));
    }

    #[test]
    fn scale_pattern_compiles_replica_count_and_namespace() {
        let steps = rule_based_compile("Scale web-app deployment to 5 replicas in production", None, "sandbox").unwrap();
        let command = steps[0].args["args"][1].as_str().unwrap();
        assert!(command.contains("--replicas=5"));
        assert!(command.contains("-n production"));
        assert!(!command.contains("-n sandbox"));
    }

    #[test]
    fn scale_pattern_falls_back_to_default_namespace_when_unstated() {
        let steps = rule_based_compile("Scale web-app deployment to 5 replicas", None, "sandbox").unwrap();
        assert!(steps[0].args["args"][1].as_str().unwrap().contains("-n sandbox"));
    }

    #[test]
    fn explicit_namespace_overrides_instruction_text() {
        let steps =
            rule_based_compile("Scale web-app deployment to 5 replicas in production", Some("staging"), "sandbox").unwrap();
        assert!(steps[0].args["args"][1].as_str().unwrap().contains("-n staging"));
    }

    #[test]
    fn unmatched_instruction_returns_none() {
        assert!(rule_based_compile("do something entirely unrelated", None, "sandbox").is_none());
    }
}
