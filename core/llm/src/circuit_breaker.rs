use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Process-local circuit breaker for a single downstream dependency,
/// modeled on the donor orchestrator's agent-health tracking: a run of
/// `failure_threshold` consecutive failures opens the circuit until
/// `cooldown_ms` has elapsed, after which one probe call is allowed through.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown_ms: i64,
    state: Mutex<State>,
}

struct State {
    consecutive_failures: u32,
    open_until: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown_ms: i64) -> Self {
        Self {
            failure_threshold,
            cooldown_ms,
            state: Mutex::new(State {
                consecutive_failures: 0,
                open_until: None,
            }),
        }
    }

    /// Whether a call should be allowed through right now.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        match state.open_until {
            Some(deadline) if Utc::now() < deadline => false,
            Some(_) => {
                // Cooldown elapsed: allow a single probe, half-open.
                state.open_until = None;
                true
            }
            None => true,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.failure_threshold {
            state.open_until = Some(Utc::now() + chrono::Duration::milliseconds(self.cooldown_ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_and_closes_on_success() {
        let breaker = CircuitBreaker::new(3, 60_000);
        assert!(breaker.allow());
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(!breaker.allow());

        breaker.record_success();
        assert!(breaker.allow());
    }
}
