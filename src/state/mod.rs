//! Breaker state subsystem.
//!
//! # States
//! - Closed: normal operation, commands run
//! - Open: dependency assumed down, fallback runs instead
//! - Half-Open: the next measurement decides between Closed and Open
//!
//! # State Transitions
//! ```text
//! Closed/Open → Open:  total > calibration AND percent > tolerance
//! Open → Half-Open:    full-window rollover
//! Half-Open → Open:    current bucket has no success AND errors in window
//! Half-Open → Closed:  otherwise, on the next measurement
//! any → forced:        open() / close(), automatic rules suspended
//! forced → restored:   reset()
//! ```
//!
//! # Design Decisions
//! - Half-Open is a single probe, not a ramp
//! - Manual override remembers the state it replaced
//! - Transitions are returned as values; the caller logs them and fires hooks

pub mod machine;

pub use machine::{Cause, State, StateMachine, Thresholds, Transition};
