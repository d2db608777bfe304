//! Per-interval outcome counters.

use serde::Serialize;

/// Kinds of events a bucket counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// The command reported success.
    Success,
    /// The command reported failure or faulted.
    Failure,
    /// The command did not report before its deadline.
    Timeout,
    /// The breaker was open and the fallback ran instead.
    Outage,
}

impl Event {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Event::Success => "success",
            Event::Failure => "failure",
            Event::Timeout => "timeout",
            Event::Outage => "outage",
        }
    }
}

/// Counters for one slice of the sliding window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub success: u64,
    pub failure: u64,
    pub timeout: u64,
    pub outage: u64,
}

impl Bucket {
    /// Create an empty bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for `event`.
    pub fn record(&mut self, event: Event) {
        let counter = match event {
            Event::Success => &mut self.success,
            Event::Failure => &mut self.failure,
            Event::Timeout => &mut self.timeout,
            Event::Outage => &mut self.outage,
        };
        *counter = counter.saturating_add(1);
    }

    /// Read the counter for `event`.
    pub fn count(&self, event: Event) -> u64 {
        match event {
            Event::Success => self.success,
            Event::Failure => self.failure,
            Event::Timeout => self.timeout,
            Event::Outage => self.outage,
        }
    }

    /// Measured calls: everything except outages.
    pub fn measured(&self) -> u64 {
        self.success
            .saturating_add(self.failure)
            .saturating_add(self.timeout)
    }

    /// Failures plus timeouts.
    pub fn errors(&self) -> u64 {
        self.failure.saturating_add(self.timeout)
    }

    /// Add another bucket's counters into this one.
    pub fn merge(&mut self, other: &Bucket) {
        self.success = self.success.saturating_add(other.success);
        self.failure = self.failure.saturating_add(other.failure);
        self.timeout = self.timeout.saturating_add(other.timeout);
        self.outage = self.outage.saturating_add(other.outage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_targets_single_counter() {
        let mut bucket = Bucket::new();
        bucket.record(Event::Failure);
        bucket.record(Event::Failure);
        bucket.record(Event::Outage);

        assert_eq!(bucket.count(Event::Failure), 2);
        assert_eq!(bucket.count(Event::Outage), 1);
        assert_eq!(bucket.count(Event::Success), 0);
        assert_eq!(bucket.count(Event::Timeout), 0);
    }

    #[test]
    fn test_outage_is_not_measured() {
        let mut bucket = Bucket::new();
        bucket.record(Event::Success);
        bucket.record(Event::Timeout);
        bucket.record(Event::Outage);

        assert_eq!(bucket.measured(), 2);
        assert_eq!(bucket.errors(), 1);
    }

    #[test]
    fn test_merge() {
        let mut a = Bucket { success: 1, failure: 2, timeout: 3, outage: 4 };
        let b = Bucket { success: 10, failure: 20, timeout: 30, outage: 40 };
        a.merge(&b);
        assert_eq!(a, Bucket { success: 11, failure: 22, timeout: 33, outage: 44 });
    }
}
