//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breaker facade produces:
//!     → tracing events (state transitions, rollovers, defaulted config)
//!     → metrics.rs (outcome counters, transition counters, state gauge)
//!
//! Consumers:
//!     → logging.rs installs a subscriber (binary only)
//!     → Prometheus exporter installed by metrics.rs (binary only)
//! ```
//!
//! # Design Decisions
//! - The library only emits; it never installs a subscriber or recorder
//! - Metrics go through the `metrics` facade and are no-ops without a recorder
//! - Fallback faults are never logged

pub mod logging;
pub mod metrics;
