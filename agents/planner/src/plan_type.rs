use shared_types::{DerivedFields, PlanType, Severity};

const COMPLEX_ERROR_LOG_THRESHOLD: usize = 5;

/// Plan type only chooses a prompt template (spec §4.1): `quick` for high
/// severity with heavy error signal, `deep_dive` for high severity with
/// moderate complexity, `comprehensive` otherwise.
pub fn select_plan_type(derived: &DerivedFields) -> PlanType {
    match derived.severity {
        Severity::High if derived.error_log_count > COMPLEX_ERROR_LOG_THRESHOLD => PlanType::Quick,
        Severity::High => PlanType::DeepDive,
        _ => PlanType::Comprehensive,
    }
}

/// Enhanced synthesis triggers: high severity, critical-service membership,
/// or complex incident (error-log count over threshold) — gated on the
/// quota manager separately by the caller.
pub fn wants_enhanced_synthesis(derived: &DerivedFields, service: Option<&str>, critical_services: &[String]) -> bool {
    let is_critical = service.map(|s| critical_services.iter().any(|c| c == s)).unwrap_or(false);
    derived.severity == Severity::High || is_critical || derived.error_log_count > COMPLEX_ERROR_LOG_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_severity_heavy_errors_is_quick() {
        let derived = DerivedFields { severity: Severity::High, error_log_count: 10 };
        assert_eq!(select_plan_type(&derived), PlanType::Quick);
    }

    #[test]
    fn high_severity_light_errors_is_deep_dive() {
        let derived = DerivedFields { severity: Severity::High, error_log_count: 1 };
        assert_eq!(select_plan_type(&derived), PlanType::DeepDive);
    }

    #[test]
    fn medium_severity_is_comprehensive() {
        let derived = DerivedFields { severity: Severity::Medium, error_log_count: 1 };
        assert_eq!(select_plan_type(&derived), PlanType::Comprehensive);
    }

    #[test]
    fn critical_service_membership_triggers_enhanced_synthesis() {
        let derived = DerivedFields { severity: Severity::Low, error_log_count: 0 };
        assert!(wants_enhanced_synthesis(&derived, Some("checkout"), &["checkout".to_string()]));
        assert!(!wants_enhanced_synthesis(&derived, Some("cart"), &["checkout".to_string()]));
    }
}
