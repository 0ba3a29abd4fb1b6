use shared_types::Incident;

/// Domain term suffixed onto every derived web-search query, and the only
/// domains a result is allowed to come from (spec §4.2's "small
/// include-domain set (documentation + Q&A)").
pub const DOMAIN_TERM: &str = "kubernetes";
pub const ALLOWED_DOMAINS: &[&str] = &[
    "kubernetes.io",
    "stackoverflow.com",
    "github.com",
    "serverfault.com",
];

/// Up to five search queries built from title, service, first symptom,
/// alphabetic tokens pulled from error log messages, and the hypothesis —
/// each suffixed with [`DOMAIN_TERM`] (spec §4.2).
pub fn derive_queries(incident: &Incident) -> Vec<String> {
    let mut queries = Vec::new();

    if let Some(title) = &incident.title {
        queries.push(format!("{title} {DOMAIN_TERM}"));
    }
    if let Some(service) = &incident.affected_service {
        queries.push(format!("{service} {DOMAIN_TERM}"));
    }
    if let Some(symptom) = incident.symptoms.first() {
        queries.push(format!("{symptom} {DOMAIN_TERM}"));
    }
    if let Some(tokens) = alphabetic_tokens_from_error_logs(incident) {
        queries.push(format!("{tokens} {DOMAIN_TERM}"));
    }
    if let Some(hypothesis) = &incident.hypothesis {
        queries.push(format!("{hypothesis} {DOMAIN_TERM}"));
    }

    queries.truncate(5);
    queries
}

fn alphabetic_tokens_from_error_logs(incident: &Incident) -> Option<String> {
    use shared_types::LogLevel;

    let tokens: Vec<String> = incident
        .all_logs()
        .iter()
        .filter(|log| matches!(log.level, Some(LogLevel::Error)))
        .flat_map(|log| log.message.split_whitespace())
        .filter(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_lowercase)
        .take(8)
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

pub fn is_allowed_domain(url: &str) -> bool {
    ALLOWED_DOMAINS.iter().any(|domain| url.contains(domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{IncidentStatus, LogEntry, LogLevel, Metrics};

    fn base_incident() -> Incident {
        Incident {
            id: "INC-1".into(),
            idempotency_key: None,
            title: Some("checkout pods crashlooping".into()),
            affected_service: Some("checkout".into()),
            hypothesis: Some("OOMKilled after deploy".into()),
            symptoms: vec!["pods restarting".into()],
            severity: None,
            status: IncidentStatus::New,
            logs: vec![LogEntry {
                timestamp: None,
                level: Some(LogLevel::Error),
                message: "OutOfMemoryError killed container 137".into(),
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
        }
    }

    #[test]
    fn derives_up_to_five_queries_suffixed_with_domain_term() {
        let queries = derive_queries(&base_incident());
        assert!(queries.len() <= 5);
        assert!(queries.iter().all(|q| q.ends_with(DOMAIN_TERM)));
    }

    #[test]
    fn alphabetic_tokens_strip_numbers() {
        let incident = base_incident();
        let tokens = alphabetic_tokens_from_error_logs(&incident).unwrap();
        assert!(!tokens.contains("137"));
        assert!(tokens.contains("outofmemoryerror") || tokens.contains("killed"));
    }

    #[test]
    fn domain_allow_list_rejects_unknown_hosts() {
        assert!(is_allowed_domain("https://kubernetes.io/docs/x"));
        assert!(!is_allowed_domain("https://random-blog.example.com/x"));
    }
}
