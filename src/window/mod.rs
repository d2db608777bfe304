//! Sliding time window subsystem.
//!
//! # Data Flow
//! ```text
//! Executor commits an outcome
//!     → time_window.rs (record into the current bucket)
//!
//! Rotation task ticks every window / N
//!     → time_window.rs (append empty bucket, evict oldest)
//!     → rollover flag handed to the state machine
//!
//! State machine / facade asks for health
//!     → snapshot.rs (sum over all buckets)
//! ```
//!
//! # Design Decisions
//! - Fixed number of buckets, so aggregation is a cheap O(N) sum
//! - Outage counts are kept per bucket but never enter the error rate
//! - The window owns no timer; rotation is driven from outside

pub mod bucket;
pub mod snapshot;
pub mod time_window;

pub use bucket::{Bucket, Event};
pub use snapshot::Snapshot;
pub use time_window::TimeWindow;
