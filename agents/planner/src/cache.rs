use shared_types::Plan;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const TTL: Duration = Duration::from_secs(300);

#[derive(Hash, PartialEq, Eq, Clone)]
struct CacheKey {
    incident_id: String,
    title: String,
    affected_service: String,
}

/// Same-incident replays within the TTL return the cached plan instead of
/// re-calling the LLM (spec §4.1's "Plan caching").
pub struct PlanCache {
    entries: Mutex<HashMap<CacheKey, (Instant, Plan)>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn key(incident_id: &str, title: &str, affected_service: &str) -> CacheKey {
        CacheKey {
            incident_id: incident_id.to_string(),
            title: title.to_string(),
            affected_service: affected_service.to_string(),
        }
    }

    pub fn get(&self, incident_id: &str, title: &str, affected_service: &str) -> Option<Plan> {
        let key = Self::key(incident_id, title, affected_service);
        let entries = self.entries.lock().expect("plan cache mutex poisoned");
        entries.get(&key).and_then(|(inserted_at, plan)| {
            if inserted_at.elapsed() < TTL {
                Some(plan.clone())
            } else {
                None
            }
        })
    }

    pub fn put(&self, incident_id: &str, title: &str, affected_service: &str, plan: Plan) {
        let key = Self::key(incident_id, title, affected_service);
        self.entries
            .lock()
            .expect("plan cache mutex poisoned")
            .insert(key, (Instant::now(), plan));
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PlanStatus;

    fn sample_plan() -> Plan {
        Plan {
            id: "plan-1".into(),
            incident_id: "INC-1".into(),
            status: PlanStatus::Proposed,
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
        }
    }

    #[test]
    fn cache_hits_on_matching_key() {
        let cache = PlanCache::new();
        cache.put("INC-1", "checkout 500s", "checkout", sample_plan());
        assert!(cache.get("INC-1", "checkout 500s", "checkout").is_some());
        assert!(cache.get("INC-1", "different title", "checkout").is_none());
    }
}
