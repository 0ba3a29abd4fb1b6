use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Normal,
    Low,
}

/// Rolling daily/hourly request quota, grounded on the donor's
/// `QuotaManager`: timestamps older than their window are dropped before
/// each check, and low-priority requests are cut off at 80% of the daily
/// limit to leave headroom for higher-priority work.
pub struct QuotaManager {
    daily_limit: u32,
    hourly_limit: u32,
    daily_usage: Mutex<Vec<Instant>>,
    hourly_usage: Mutex<Vec<Instant>>,
}

impl QuotaManager {
    pub fn new(daily_limit: u32, hourly_limit: u32) -> Self {
        Self {
            daily_limit,
            hourly_limit,
            daily_usage: Mutex::new(Vec::new()),
            hourly_usage: Mutex::new(Vec::new()),
        }
    }

    pub fn can_make_request(&self, priority: Priority) -> bool {
        let now = Instant::now();
        let mut daily = self.daily_usage.lock().expect("quota mutex poisoned");
        let mut hourly = self.hourly_usage.lock().expect("quota mutex poisoned");
        daily.retain(|t| now.duration_since(*t) < Duration::from_secs(86_400));
        hourly.retain(|t| now.duration_since(*t) < Duration::from_secs(3_600));

        if daily.len() as u32 >= self.daily_limit {
            return false;
        }
        if hourly.len() as u32 >= self.hourly_limit {
            return false;
        }
        if priority == Priority::Low && daily.len() as f64 > self.daily_limit as f64 * 0.8 {
            return false;
        }
        true
    }

    pub fn record_request(&self) {
        let now = Instant::now();
        self.daily_usage.lock().expect("quota mutex poisoned").push(now);
        self.hourly_usage.lock().expect("quota mutex poisoned").push(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_requests_past_the_hourly_limit() {
        let quota = QuotaManager::new(50, 2);
        assert!(quota.can_make_request(Priority::Normal));
        quota.record_request();
        assert!(quota.can_make_request(Priority::Normal));
        quota.record_request();
        assert!(!quota.can_make_request(Priority::Normal));
    }

    #[test]
    fn low_priority_cuts_off_at_eighty_percent_of_daily() {
        let quota = QuotaManager::new(10, 100);
        for _ in 0..9 {
            quota.record_request();
        }
        assert!(!quota.can_make_request(Priority::Low));
        assert!(quota.can_make_request(Priority::Normal));
    }
}
