pub mod errors;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use errors::PlatformError;
pub use health::{DependencyStatus, HealthState};
pub use logging::init_logging;
pub use metrics::{init_metrics, record_counter, record_histogram};
pub use tracing::{correlation_span, init_tracing, with_correlation_context};
