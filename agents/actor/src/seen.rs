use std::collections::HashSet;
use std::sync::Mutex;

/// Process-wide idempotency guard (spec §4.4, gate 1): a plan whose
/// `effective_idempotency_key()` has already been seen is a duplicate and
/// is acknowledged without re-executing.
pub struct SeenSet {
    keys: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self { keys: Mutex::new(HashSet::new()) }
    }

    /// Returns `true` the first time a key is observed, `false` on every
    /// subsequent call for the same key.
    pub fn observe(&self, key: &str) -> bool {
        self.keys.lock().expect("seen-set mutex poisoned").insert(key.to_string())
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_observation_of_the_same_key_is_a_duplicate() {
        let seen = SeenSet::new();
        assert!(seen.observe("INC-1:plan-1"));
        assert!(!seen.observe("INC-1:plan-1"));
    }
}
