//! Command execution subsystem.
//!
//! # Data Flow
//! ```text
//! Breaker::run(command, fallback, timeout)
//!     → breaker open?  fallback(), record OUTAGE, done
//!     → otherwise:     invocation.rs (one Completion per call)
//!                      → arm timeout timer (optional)
//!                      → command(completion); Err or panic ⇒ Failure
//!                      → first complete(outcome) records + re-evaluates
//!
//! Breaker::call(future, timeout)
//!     → call.rs (async: tokio timeout, Result ⇒ outcome)
//! ```
//!
//! # Design Decisions
//! - Exactly one outcome per invocation, enforced by an atomic flag
//! - Later completions are ignorable errors, never panics
//! - A timeout stops bookkeeping only; the command keeps running
//! - Command and fallback faults, panics included, never reach the caller
//!   of `run`

pub mod call;
pub mod invocation;

pub use call::CallError;
pub use invocation::{Completion, CompletionError, Outcome};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::breaker::Shared;

/// Which path a `run` call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The command was invoked.
    Executed,
    /// The breaker was open and the fallback ran.
    ShortCircuited,
}

/// Timeout for one call: a positive override, else the configured default.
pub(crate) fn effective_timeout(
    override_timeout: Option<Duration>,
    default_timeout: Option<Duration>,
) -> Option<Duration> {
    override_timeout
        .filter(|timeout| !timeout.is_zero())
        .or(default_timeout)
}

pub(crate) fn run<C, E, F, R>(
    shared: &Arc<Shared>,
    command: C,
    fallback: F,
    timeout: Option<Duration>,
) -> Dispatch
where
    C: FnOnce(Completion) -> Result<(), E>,
    F: FnOnce() -> R,
{
    if shared.is_open() {
        // whatever the fallback returns, an error or a panic included, is dropped
        if panic::catch_unwind(AssertUnwindSafe(fallback)).is_err() {
            tracing::debug!(breaker = %shared.settings.name, "Fallback panicked");
        }
        shared.record_outage();
        return Dispatch::ShortCircuited;
    }

    let completion = Completion::new(shared.clone());
    if let Some(timeout) = effective_timeout(timeout, shared.settings.default_timeout) {
        completion.arm_timeout(timeout);
    }

    let handle = completion.clone();
    match panic::catch_unwind(AssertUnwindSafe(move || command(handle))) {
        Ok(Ok(())) => {}
        Ok(Err(_)) => {
            let _ = completion.failure();
        }
        Err(_) => {
            tracing::debug!(
                breaker = %shared.settings.name,
                invocation = %completion.id(),
                "Command panicked"
            );
            let _ = completion.failure();
        }
    }
    Dispatch::Executed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_timeout() {
        let default = Some(Duration::from_secs(2));
        assert_eq!(effective_timeout(None, None), None);
        assert_eq!(effective_timeout(None, default), default);
        assert_eq!(effective_timeout(Some(Duration::ZERO), default), default);
        assert_eq!(effective_timeout(Some(Duration::ZERO), None), None);
        assert_eq!(
            effective_timeout(Some(Duration::from_millis(5)), default),
            Some(Duration::from_millis(5))
        );
    }
}
