//! Bucketed sliding window.
//!
//! # Responsibilities
//! - Hold at most N buckets, newest last
//! - Route every write to the newest bucket
//! - Count rotations and report a rollover once per full cycle
//!
//! # Design Decisions
//! - Always holds at least one bucket so writes before the first rotation
//!   are retained
//! - Capacity below 1 is raised to 1
//! - Aggregation recomputes from scratch; N is small

use std::collections::VecDeque;

use crate::window::bucket::{Bucket, Event};
use crate::window::snapshot::Snapshot;

/// An ordered, capacity-bounded sequence of buckets.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    buckets: VecDeque<Bucket>,
    capacity: usize,
    rotations: usize,
}

impl TimeWindow {
    /// Create a window holding up to `capacity` buckets.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        // grows with rotations; capacity is user input and may be huge
        let mut buckets = VecDeque::new();
        buckets.push_back(Bucket::new());

        Self {
            buckets,
            capacity,
            rotations: 0,
        }
    }

    /// Start a new bucket and drop the oldest ones beyond capacity.
    ///
    /// Returns `true` when the rotation counter has completed a full cycle,
    /// i.e. more than `capacity` rotations since the counter last wrapped.
    pub fn rotate(&mut self) -> bool {
        self.evict();
        self.buckets.push_back(Bucket::new());
        self.evict();

        self.rotations += 1;
        if self.rotations > self.capacity {
            self.rotations = 0;
            true
        } else {
            false
        }
    }

    fn evict(&mut self) {
        while self.buckets.len() > self.capacity {
            self.buckets.pop_front();
        }
    }

    /// Increment `event` on the current bucket.
    pub fn record(&mut self, event: Event) {
        if self.buckets.is_empty() {
            self.buckets.push_back(Bucket::new());
        }
        if let Some(current) = self.buckets.back_mut() {
            current.record(event);
        }
    }

    /// The bucket receiving writes.
    pub fn current(&self) -> Bucket {
        self.buckets.back().copied().unwrap_or_default()
    }

    /// Sum of every counter across the window, outages included.
    pub fn totals(&self) -> Bucket {
        self.buckets.iter().fold(Bucket::new(), |mut acc, bucket| {
            acc.merge(bucket);
            acc
        })
    }

    /// Error statistics across the window.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_totals(&self.totals())
    }

    /// Number of buckets currently held.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the window holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Maximum number of buckets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rotations since the counter last wrapped.
    pub fn rotations(&self) -> usize {
        self.rotations
    }
}
