use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity bucket assigned to an incident, either supplied by the caller or
/// derived heuristically by the Planner's normalizer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Low
    }
}

/// Lifecycle status of an `Incident`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    New,
    Triaged,
    Resolved,
    Skipped,
    Failed,
}

impl Default for IncidentStatus {
    fn default() -> Self {
        IncidentStatus::New
    }
}

/// Severity of a single log line, always classified and never left null.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub level: Option<LogLevel>,
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub pod: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Kubernetes event type, per the core/v1 Event API.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum K8sEventType {
    Warning,
    Normal,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct K8sEvent {
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub event_type: K8sEventType,
    pub involved_object: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GitCommit {
    pub sha: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub files_changed: Vec<String>,
}

/// Canonical metric keys plus an overflow map for anything else the caller
/// supplied. Kept flat (not nested) to match the wire contract in spec §6.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<f64>,
    #[serde(default)]
    pub error_rate: Option<f64>,
    #[serde(default)]
    pub latency_p95_ms: Option<f64>,
    #[serde(default)]
    pub request_rate_rps: Option<f64>,
    #[serde(flatten)]
    pub overflow: HashMap<String, serde_json::Value>,
}

/// Fields computed by the Planner's normalizer rather than supplied by the
/// caller: heuristic severity (when absent) and the error-log count used to
/// pick a plan type and gate enhanced synthesis.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DerivedFields {
    pub severity: Severity,
    pub error_log_count: usize,
}

/// Caps applied by the normalizer before any evidence reaches a prompt.
pub const MAX_LOGS: usize = 200;
pub const MAX_K8S_EVENTS: usize = 100;
pub const MAX_GIT_COMMITS: usize = 50;

/// The canonical unit of work entering the pipeline on `incidents.new`.
///
/// Unknown fields on the wire are preserved in `overflow` so normalization
/// round-trips losslessly (spec §9's "dynamic typing and mixed shapes" note).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Incident {
    pub id: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub affected_service: Option<String>,
    #[serde(default)]
    pub hypothesis: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub status: IncidentStatus,

    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Accepted as an alternate input field; merged into `logs` by the
    /// normalizer (spec §6's minimum-accepted Incident JSON).
    #[serde(default)]
    pub loki_logs: Vec<LogEntry>,
    #[serde(default)]
    pub app_logs: Vec<LogEntry>,
    #[serde(default)]
    pub k8s_events: Vec<K8sEvent>,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub git_commits: Vec<GitCommit>,

    #[serde(default)]
    pub derived: Option<DerivedFields>,

    #[serde(flatten)]
    pub overflow: serde_json::Map<String, serde_json::Value>,
}

impl Incident {
    /// Merge all log sources into one ordered list. Does not classify
    /// levels or cap length; that is the normalizer's job
    /// (see `planner`'s `normalize` module).
    pub fn all_logs(&self) -> Vec<LogEntry> {
        let mut merged = Vec::with_capacity(self.logs.len() + self.loki_logs.len() + self.app_logs.len());
        merged.extend(self.logs.iter().cloned());
        merged.extend(self.loki_logs.iter().cloned());
        merged.extend(self.app_logs.iter().cloned());
        merged
    }

    pub fn error_log_count(&self) -> usize {
        self.all_logs()
            .iter()
            .filter(|l| matches!(l.level, Some(LogLevel::Error)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_round_trips_unknown_fields() {
        let raw = serde_json::json!({
            "id": "INC-1",
            "title": "checkout 500s",
            "weird_vendor_field": {"nested": true},
        });
        let incident: Incident = serde_json::from_value(raw.clone()).unwrap();
        assert!(incident.overflow.contains_key("weird_vendor_field"));

        let back = serde_json::to_value(&incident).unwrap();
        assert_eq!(back["weird_vendor_field"], raw["weird_vendor_field"]);
    }

    #[test]
    fn all_logs_merges_three_sources() {
        let mut incident = Incident {
            id: "INC-2".into(),
            idempotency_key: None,
            title: None,
            affected_service: None,
            hypothesis: None,
            symptoms: vec![],
            severity: None,
            status: IncidentStatus::New,
            logs: vec![LogEntry {
                timestamp: None,
                level: Some(LogLevel::Error),
                message: "a".into(),
                source: None,
                pod: None,
                container: None,
                namespace: None,
            }],
            loki_logs: vec![],
            app_logs: vec![],
            k8s_events: vec![],
            metrics: Metrics::default(),
            git_commits: vec![],
            derived: None,
            overflow: Default::default(),
        };
        incident.loki_logs.push(LogEntry {
            timestamp: None,
            level: Some(LogLevel::Warn),
            message: "b".into(),
            source: None,
            pod: None,
            container: None,
            namespace: None,
        });
        assert_eq!(incident.all_logs().len(), 2);
        assert_eq!(incident.error_log_count(), 1);
    }
}
