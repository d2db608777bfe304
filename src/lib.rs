//! Circuit breaker for guarding calls to an unreliable dependency.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                       BREAKER                        │
//!                 │                                                      │
//!   run / call    │  ┌───────────┐  open?  ┌──────────┐                  │
//!  ───────────────┼─▶│ executor  │────────▶│ fallback │──▶ OUTAGE        │
//!                 │  │           │         └──────────┘                  │
//!                 │  │ command + │  outcome  ┌────────────┐  snapshot    │
//!                 │  │ completion│──────────▶│   window   │────────┐     │
//!                 │  └───────────┘           │  buckets   │        ▼     │
//!                 │                          └────────────┘  ┌─────────┐ │
//!                 │   rotation task ──────────▶ rotate ─────▶│  state  │ │
//!                 │   (every window / N)        rollover     │ machine │ │
//!                 │                                          └────┬────┘ │
//!                 │                                               │      │
//!                 │            on_open / on_close / logs / metrics ◀┘    │
//!                 └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use circuit_breaker::{Breaker, BreakerConfig};
//!
//! # async fn demo() {
//! let breaker = Breaker::builder(BreakerConfig::named("inventory").tolerance_percent(25.0))
//!     .on_open(|snapshot| eprintln!("inventory unhealthy: {snapshot:?}"))
//!     .build();
//!
//! let result = breaker
//!     .call(|| async { Ok::<_, std::io::Error>("stock") }, Some(Duration::from_millis(200)))
//!     .await;
//! # let _ = result;
//! # }
//! ```

// Building blocks
pub mod state;
pub mod window;

// Execution
pub mod breaker;
pub mod executor;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use breaker::{Breaker, BreakerBuilder, BreakerError};
pub use config::{AppConfig, BreakerConfig, Settings};
pub use executor::{CallError, Completion, CompletionError, Dispatch, Outcome};
pub use state::{Cause, State, Transition};
pub use window::{Bucket, Event, Snapshot};
