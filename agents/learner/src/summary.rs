use shared_types::{Resolution, ResolutionStatus};

/// Join identity, service, severity, hypothesis, AI confidence, resolution
/// action, and notes into one text blob for embedding (spec §4.5 step 1),
/// grounded in the donor's `create_incident_summary`.
pub fn build_summary(
    incident_id: &str,
    title: &str,
    affected_service: &str,
    severity: &str,
    hypothesis: &str,
    confidence: f32,
    resolution: &Resolution,
) -> String {
    let resolution_action = resolution.resolution_action.as_deref().unwrap_or("No action recorded");
    let notes = match resolution.status {
        ResolutionStatus::Resolved => "Resolved successfully.",
        ResolutionStatus::Failed => "Resolution failed.",
        ResolutionStatus::Skipped => "Resolution skipped by autonomy policy.",
    };

    format!(
        "Incident {incident_id}: {title} affecting {affected_service} (Severity: {severity}). \
         AI Analysis: {hypothesis} (Confidence: {confidence:.2}). \
         Resolution: {resolution_action}. Notes: {notes}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::StepOutput;

    #[test]
    fn summary_includes_every_field() {
        let resolution = Resolution {
            incident_id: "INC-1".into(),
            plan_id: "plan-1".into(),
            status: ResolutionStatus::Resolved,
            resolution_action: Some("restarted checkout deployment".into()),
            outputs: vec![StepOutput { step: 0, tool: "kubectl.run".into(), result: None, error: None }],
            duration_ms: 1200,
        };
        let summary = build_summary("INC-1", "checkout 500s", "checkout", "high", "pod crash loop", 0.87, &resolution);
        assert!(summary.contains("INC-1"));
        assert!(summary.contains("checkout 500s"));
        assert!(summary.contains("0.87"));
        assert!(summary.contains("restarted checkout deployment"));
        assert!(summary.contains("Resolved successfully"));
    }
}
