/// DDL for the persistent plan/incident store (spec §6, "Persistent plan
/// store schema"). Run once per connection pool at startup; `CREATE TABLE
/// IF NOT EXISTS` makes it safe to call on every agent boot.
pub const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS plans (
        id TEXT PRIMARY KEY,
        incident_id TEXT NOT NULL,
        status TEXT NOT NULL,
        body_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_plans_incident_id ON plans(incident_id)",
    "CREATE INDEX IF NOT EXISTS idx_plans_status ON plans(status)",
    "CREATE INDEX IF NOT EXISTS idx_plans_created_at ON plans(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_plans_incident_status ON plans(incident_id, status)",
    "CREATE TABLE IF NOT EXISTS incidents (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        body_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status)",
    "CREATE INDEX IF NOT EXISTS idx_incidents_created_at ON incidents(created_at)",
    "CREATE TABLE IF NOT EXISTS resolutions (
        id TEXT PRIMARY KEY,
        plan_id TEXT NOT NULL,
        incident_id TEXT NOT NULL,
        status TEXT NOT NULL,
        body_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_resolutions_incident_id ON resolutions(incident_id)",
];
