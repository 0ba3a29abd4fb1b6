use crate::errors::PlatformError;
use std::env;
use tracing::{info, info_span, Instrument, Span};

/// Initialize structured tracing for an agent process.
pub fn init_tracing(service_name: &str) -> Result<(), PlatformError> {
    crate::logging::init_logging(service_name);

    let environment = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

    info!(
        service = %service_name,
        environment = %environment,
        event = "startup",
        "agent tracing initialized"
    );

    Ok(())
}

/// Span for one incident/plan moving through an agent's handler, tagged
/// with the id that drove it (not a freshly minted one — every message on
/// the bus already carries its own incident/plan id).
pub fn correlation_span(correlation_id: &str, operation: &str) -> Span {
    info_span!(
        "pipeline_operation",
        %operation,
        correlation_id = %correlation_id,
        event_type = "message",
    )
}

/// Instrument an async handler with correlation context for one message.
pub async fn with_correlation_context<F, R>(correlation_id: &str, operation: &str, f: F) -> R
where
    F: std::future::Future<Output = R>,
{
    let span = correlation_span(correlation_id, operation);
    f.instrument(span).await
}
