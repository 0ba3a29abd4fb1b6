//! SQLite-backed persistent store for plan, incident, and resolution
//! records, pooled with `r2d2` the way the donor orchestrator pools its
//! agent registry and action-trace log.

mod error;
mod schema;

pub use error::{StoreError, StoreResult};

use chrono::Utc;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use shared_types::{Incident, Plan, Resolution};
use std::time::Duration;
use tokio::task;

type DbPool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    /// Open (or create) the SQLite database at `path` and run migrations.
    /// `path` may be `:memory:` for tests.
    pub fn open(path: &str) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = r2d2::Pool::builder()
            .max_size(10)
            .min_idle(Some(1))
            .idle_timeout(Some(Duration::from_secs(300)))
            .max_lifetime(Some(Duration::from_secs(1800)))
            .build(manager)?;

        let conn = pool.get()?;
        for statement in schema::MIGRATIONS {
            conn.execute(statement, [])?;
        }

        Ok(Self { pool })
    }

    /// Upsert a plan by `id`, touching `created_at` only on first insert and
    /// `updated_at` on every write, per spec §6.
    pub async fn upsert_plan(&self, plan: &Plan) -> StoreResult<()> {
        let pool = self.pool.clone();
        let body = serde_json::to_string(plan)?;
        let id = plan.id.clone();
        let incident_id = plan.incident_id.clone();
        let status = format!("{:?}", plan.status).to_lowercase();
        let now = Utc::now().to_rfc3339();

        task::spawn_blocking(move || -> StoreResult<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO plans (id, incident_id, status, body_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    incident_id = excluded.incident_id,
                    status = excluded.status,
                    body_json = excluded.body_json,
                    updated_at = excluded.updated_at",
                params![id, incident_id, status, body, now],
            )?;
            Ok(())
        })
        .await
        .expect("blocking task panicked")
    }

    pub async fn get_plan(&self, id: &str) -> StoreResult<Option<Plan>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        task::spawn_blocking(move || -> StoreResult<Option<Plan>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT body_json FROM plans WHERE id = ?1")?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => {
                    let body: String = row.get(0)?;
                    Ok(Some(serde_json::from_str(&body)?))
                }
                None => Ok(None),
            }
        })
        .await
        .expect("blocking task panicked")
    }

    pub async fn list_plans_for_incident(&self, incident_id: &str) -> StoreResult<Vec<Plan>> {
        let pool = self.pool.clone();
        let incident_id = incident_id.to_string();
        task::spawn_blocking(move || -> StoreResult<Vec<Plan>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT body_json FROM plans WHERE incident_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![incident_id], |row| {
                let body: String = row.get(0)?;
                Ok(body)
            })?;
            let mut plans = Vec::new();
            for row in rows {
                plans.push(serde_json::from_str(&row?)?);
            }
            Ok(plans)
        })
        .await
        .expect("blocking task panicked")
    }

    pub async fn upsert_incident(&self, incident: &Incident) -> StoreResult<()> {
        let pool = self.pool.clone();
        let body = serde_json::to_string(incident)?;
        let id = incident.id.clone();
        let status = format!("{:?}", incident.status).to_lowercase();
        let now = Utc::now().to_rfc3339();

        task::spawn_blocking(move || -> StoreResult<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO incidents (id, status, body_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status,
                    body_json = excluded.body_json,
                    updated_at = excluded.updated_at",
                params![id, status, body, now],
            )?;
            Ok(())
        })
        .await
        .expect("blocking task panicked")
    }

    pub async fn get_incident(&self, id: &str) -> StoreResult<Option<Incident>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        task::spawn_blocking(move || -> StoreResult<Option<Incident>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT body_json FROM incidents WHERE id = ?1")?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => {
                    let body: String = row.get(0)?;
                    Ok(Some(serde_json::from_str(&body)?))
                }
                None => Ok(None),
            }
        })
        .await
        .expect("blocking task panicked")
    }

    /// Resolutions have no natural id of their own (spec §5.5's wire shape
    /// is keyed by `incident_id`/`plan_id`); the store mints one so repeated
    /// writes for the same plan (retries) upsert instead of duplicating.
    pub async fn insert_resolution(&self, resolution: &Resolution) -> StoreResult<()> {
        let pool = self.pool.clone();
        let body = serde_json::to_string(resolution)?;
        let id = Plan::idempotency_key_for(&resolution.incident_id, &resolution.plan_id);
        let plan_id = resolution.plan_id.clone();
        let incident_id = resolution.incident_id.clone();
        let status = format!("{:?}", resolution.status).to_lowercase();
        let now = Utc::now().to_rfc3339();

        task::spawn_blocking(move || -> StoreResult<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO resolutions (id, plan_id, incident_id, status, body_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status,
                    body_json = excluded.body_json",
                params![id, plan_id, incident_id, status, body, now],
            )?;
            Ok(())
        })
        .await
        .expect("blocking task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{PlanStatus};

    fn sample_plan(id: &str, incident_id: &str, status: PlanStatus) -> Plan {
        Plan {
            id: id.into(),
            incident_id: incident_id.into(),
            status,
            risk_level: None,
            risk: Some(0.2),
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

    #[tokio::test]
    async fn upsert_plan_round_trips_and_updates_in_place() {
        let store = Store::open(":memory:").unwrap();
        let plan = sample_plan("plan-1", "INC-1", PlanStatus::Proposed);
        store.upsert_plan(&plan).await.unwrap();

        let fetched = store.get_plan("plan-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, PlanStatus::Proposed);

        let mut approved = plan.clone();
        approved.status = PlanStatus::Approved;
        store.upsert_plan(&approved).await.unwrap();

        let fetched = store.get_plan("plan-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, PlanStatus::Approved);
    }

    #[tokio::test]
    async fn list_plans_for_incident_filters_by_incident_id() {
        let store = Store::open(":memory:").unwrap();
        store.upsert_plan(&sample_plan("plan-1", "INC-1", PlanStatus::Proposed)).await.unwrap();
        store.upsert_plan(&sample_plan("plan-2", "INC-1", PlanStatus::Approved)).await.unwrap();
        store.upsert_plan(&sample_plan("plan-3", "INC-2", PlanStatus::Proposed)).await.unwrap();

        let plans = store.list_plans_for_incident("INC-1").await.unwrap();
        assert_eq!(plans.len(), 2);
    }

    #[tokio::test]
    async fn missing_plan_returns_none() {
        let store = Store::open(":memory:").unwrap();
        assert!(store.get_plan("does-not-exist").await.unwrap().is_none());
    }
}
