use shared_types::RiskLevel;
use std::collections::HashSet;

/// Risk-based approval policy (spec §4.3, §9 open question #2): plans whose
/// effective risk level is in `auto_approve_risk_levels` are approved on
/// sight; everything else waits for an explicit approval command.
pub struct ApprovalPolicy {
    auto_approve_risk_levels: HashSet<RiskLevel>,
}

impl ApprovalPolicy {
    pub fn new(auto_approve_risk_levels: HashSet<RiskLevel>) -> Self {
        Self { auto_approve_risk_levels }
    }

    pub fn default_policy() -> Self {
        Self::new(HashSet::from([RiskLevel::Medium]))
    }

    pub fn auto_approves(&self, risk_level: RiskLevel) -> bool {
        self.auto_approve_risk_levels.contains(&risk_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_risk_auto_approves_by_default() {
        let policy = ApprovalPolicy::default_policy();
        assert!(policy.auto_approves(RiskLevel::Medium));
        assert!(!policy.auto_approves(RiskLevel::High));
        assert!(!policy.auto_approves(RiskLevel::Low));
    }

    #[test]
    fn custom_policy_can_widen_auto_approval() {
        let policy = ApprovalPolicy::new(HashSet::from([RiskLevel::Low, RiskLevel::Medium]));
        assert!(policy.auto_approves(RiskLevel::Low));
        assert!(policy.auto_approves(RiskLevel::Medium));
        assert!(!policy.auto_approves(RiskLevel::High));
    }
}
