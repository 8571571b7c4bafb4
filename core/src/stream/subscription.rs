//! A single client's subscription to one metric.

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// One metric a client wants pushed to it, at a bounded rate.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub metric: String,
    pub interval: Duration,
    pub filters: Option<HashMap<String, Value>>,
    /// `SystemTime::UNIX_EPOCH` forces the very first fan-out tick to send
    /// immediately, regardless of `interval`.
    pub last_sent: SystemTime,
}

impl Subscription {
    /// Build a fresh subscription from a client-requested interval in
    /// seconds. An interval under one second is invalid and clamped to the
    /// protocol default.
    pub fn new(metric: String, requested_interval_secs: Option<u64>, filters: Option<HashMap<String, Value>>, default_interval: Duration) -> Self {
        let interval = match requested_interval_secs {
            Some(secs) if secs >= 1 => Duration::from_secs(secs),
            _ => default_interval,
        };
        Self {
            metric,
            interval,
            filters,
            last_sent: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn is_due(&self, now: SystemTime) -> bool {
        now.duration_since(self.last_sent).unwrap_or(Duration::ZERO) >= self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_under_one_second_clamps_to_default() {
        let sub = Subscription::new("cpu".to_string(), Some(0), None, Duration::from_secs(5));
        assert_eq!(sub.interval, Duration::from_secs(5));
    }

    #[test]
    fn missing_interval_uses_default() {
        let sub = Subscription::new("cpu".to_string(), None, None, Duration::from_secs(5));
        assert_eq!(sub.interval, Duration::from_secs(5));
    }

    #[test]
    fn valid_interval_is_honored() {
        let sub = Subscription::new("cpu".to_string(), Some(10), None, Duration::from_secs(5));
        assert_eq!(sub.interval, Duration::from_secs(10));
    }

    #[test]
    fn new_subscription_is_immediately_due() {
        let sub = Subscription::new("cpu".to_string(), Some(30), None, Duration::from_secs(5));
        assert!(sub.is_due(SystemTime::now()));
    }

    #[test]
    fn subscription_is_not_due_before_interval_elapses() {
        let mut sub = Subscription::new("cpu".to_string(), Some(30), None, Duration::from_secs(5));
        sub.last_sent = SystemTime::now();
        assert!(!sub.is_due(SystemTime::now()));
    }
}
