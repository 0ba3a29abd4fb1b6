use shared_types::{DerivedFields, Incident, LogEntry, LogLevel, Severity, MAX_GIT_COMMITS, MAX_K8S_EVENTS, MAX_LOGS};

/// Classify a log's level by explicit field first, then keyword match, per
/// spec §4.1: `exception|panic|fatal|stacktrace|error` ⇒ error,
/// `warn|timeout|retry` ⇒ warn, else info.
pub fn classify_level(log: &LogEntry) -> LogLevel {
    if let Some(level) = log.level {
        return level;
    }
    let message = log.message.to_lowercase();
    const ERROR_KEYWORDS: [&str; 5] = ["exception", "panic", "fatal", "stacktrace", "error"];
    const WARN_KEYWORDS: [&str; 3] = ["warn", "timeout", "retry"];

    if ERROR_KEYWORDS.iter().any(|kw| message.contains(kw)) {
        LogLevel::Error
    } else if WARN_KEYWORDS.iter().any(|kw| message.contains(kw)) {
        LogLevel::Warn
    } else {
        LogLevel::Info
    }
}

/// Heuristic severity when the caller did not supply one (spec §4.1):
/// `high` if error_rate >= 0.05 OR latency_p95_ms >= 800 OR error_log_count > 5;
/// `medium` if error_log_count > 0; `low` otherwise.
fn heuristic_severity(incident: &Incident, error_log_count: usize) -> Severity {
    let error_rate = incident.metrics.error_rate.unwrap_or(0.0);
    let latency_p95 = incident.metrics.latency_p95_ms.unwrap_or(0.0);

    if error_rate >= 0.05 || latency_p95 >= 800.0 || error_log_count > 5 {
        Severity::High
    } else if error_log_count > 0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Merge log sources, classify every level, cap evidence lists, and compute
/// derived fields. Mutates `incident.logs` in place to hold the merged,
/// capped, classified set so downstream prompt construction sees one list.
pub fn normalize(incident: &mut Incident) {
    let mut merged = incident.all_logs();
    for log in merged.iter_mut() {
        log.level = Some(classify_level(log));
    }
    merged.truncate(MAX_LOGS);

    incident.logs = merged;
    incident.loki_logs.clear();
    incident.app_logs.clear();

    incident.k8s_events.truncate(MAX_K8S_EVENTS);
    incident.git_commits.truncate(MAX_GIT_COMMITS);

    let error_log_count = incident
        .logs
        .iter()
        .filter(|l| matches!(l.level, Some(LogLevel::Error)))
        .count();

    let severity = incident.severity.unwrap_or_else(|| heuristic_severity(incident, error_log_count));

    incident.derived = Some(DerivedFields { severity, error_log_count });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{IncidentStatus, Metrics};

    fn incident_with_logs(messages: &[&str]) -> Incident {
        Incident {
            id: "INC-1".into(),
            idempotency_key: None,
            title: None,
            affected_service: None,
            hypothesis: None,
            symptoms: vec![],
            severity: None,
            status: IncidentStatus::New,
            logs: messages
                .iter()
                .map(|m| LogEntry {
                    timestamp: None,
                    level: None,
                    message: m.to_string(),
                    source: None,
                    pod: None,
                    container: None,
                    namespace: None,
                })
                .collect(),
            loki_logs: vec![],
            app_logs: vec![],
            k8s_events: vec![],
            metrics: Metrics::default(),
            git_commits: vec![],
            derived: None,
            overflow: Default::default(),
        }
    }

    #[test]
    fn classifies_by_keyword_when_level_absent() {
        let mut incident = incident_with_logs(&["NullPointerException thrown", "retry scheduled", "all good"]);
        normalize(&mut incident);
        assert_eq!(incident.logs[0].level, Some(LogLevel::Error));
        assert_eq!(incident.logs[1].level, Some(LogLevel::Warn));
        assert_eq!(incident.logs[2].level, Some(LogLevel::Info));
    }

    #[test]
    fn heuristic_severity_escalates_with_high_error_rate() {
        let mut incident = incident_with_logs(&["fine"]);
        incident.metrics.error_rate = Some(0.1);
        normalize(&mut incident);
        assert_eq!(incident.derived.unwrap().severity, Severity::High);
    }

    #[test]
    fn heuristic_severity_is_medium_with_any_errors() {
        let mut incident = incident_with_logs(&["fatal crash"]);
        normalize(&mut incident);
        let derived = incident.derived.unwrap();
        assert_eq!(derived.error_log_count, 1);
        assert_eq!(derived.severity, Severity::Medium);
    }

    #[test]
    fn caller_supplied_severity_is_respected() {
        let mut incident = incident_with_logs(&["fine"]);
        incident.severity = Some(Severity::High);
        normalize(&mut incident);
        assert_eq!(incident.derived.unwrap().severity, Severity::High);
    }
}
