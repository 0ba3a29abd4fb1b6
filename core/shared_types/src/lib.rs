//! Wire types shared by every agent and library crate in the incident
//! pipeline: `Incident`, `Plan`, `Resolution`, `EnrichedContext`, and the
//! pipeline-wide configuration and error taxonomy.

pub mod config;
pub mod context;
pub mod errors;
pub mod incident;
pub mod plan;
pub mod resolution;

pub use config::PipelineConfig;
pub use context::{ContextSource, EnrichedContext, HistoricalIncident, SimilarIncident, WebResult};
pub use errors::ErrorCategory;
pub use incident::{
    DerivedFields, GitCommit, Incident, IncidentStatus, K8sEvent, K8sEventType, LogEntry, LogLevel,
    Metrics, Severity, MAX_GIT_COMMITS, MAX_K8S_EVENTS, MAX_LOGS,
};
pub use plan::{ApprovalCommand, Plan, PlanStatus, PlanType, RiskLevel, Rollout, Step, ToolName};
pub use resolution::{Resolution, ResolutionStatus, StepOutput};
