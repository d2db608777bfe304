//! Aggregated health of the sliding window.

use serde::Serialize;

use crate::window::bucket::Bucket;

/// Error statistics over every bucket currently in the window.
///
/// Outages are excluded: `total` counts only calls that actually reached the
/// command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    /// Successes, failures and timeouts.
    pub total: u64,
    /// Failures and timeouts.
    pub error: u64,
    /// `error / max(total, 1) * 100`, always within `[0, 100]`.
    pub percent: f64,
}

impl Snapshot {
    /// Build a snapshot from the sum of all buckets.
    pub fn from_totals(totals: &Bucket) -> Self {
        let total = totals.measured();
        let error = totals.errors();
        let percent = error as f64 / total.max(1) as f64 * 100.0;

        Self { total, error, percent }
    }

    /// Snapshot of an empty window.
    pub fn empty() -> Self {
        Self { total: 0, error: 0, percent: 0.0 }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
