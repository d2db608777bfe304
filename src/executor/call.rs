//! Async command execution.
//!
//! Panics in the command or the fallback are caught at this boundary.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;

use crate::breaker::Shared;
use crate::executor::{effective_timeout, Outcome};

/// Why an async call through the breaker did not produce a value.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The breaker was open; the command was not started.
    #[error("circuit breaker is open")]
    Rejected,

    /// The command returned an error.
    #[error("command failed: {0}")]
    Failed(E),

    /// The command did not finish in time and was dropped.
    #[error("command timed out after {0:?}")]
    TimedOut(Duration),

    /// The command panicked. Counted as a failure.
    #[error("command panicked")]
    Panicked,
}

impl<E> CallError<E> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, CallError::Rejected)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::TimedOut(_))
    }
}

pub(crate) async fn call<F, Fut, T, E>(
    shared: &Arc<Shared>,
    command: F,
    timeout: Option<Duration>,
) -> Result<T, CallError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if shared.is_open() {
        shared.record_outage();
        tracing::debug!(breaker = %shared.settings.name, "Call rejected, circuit open");
        return Err(CallError::Rejected);
    }

    measure(shared, command, timeout).await
}

pub(crate) async fn call_with_fallback<F, Fut, T, E, G, GFut>(
    shared: &Arc<Shared>,
    command: F,
    fallback: G,
    timeout: Option<Duration>,
) -> Result<T, CallError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    G: FnOnce() -> GFut,
    GFut: Future<Output = T>,
{
    if shared.is_open() {
        let value = AssertUnwindSafe(async move { fallback().await })
            .catch_unwind()
            .await;
        shared.record_outage();
        return value.map_err(|_| {
            tracing::debug!(breaker = %shared.settings.name, "Fallback panicked");
            CallError::Rejected
        });
    }

    measure(shared, command, timeout).await
}

async fn measure<F, Fut, T, E>(
    shared: &Arc<Shared>,
    command: F,
    timeout: Option<Duration>,
) -> Result<T, CallError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let guarded = AssertUnwindSafe(async move { command().await }).catch_unwind();
    let result = match effective_timeout(timeout, shared.settings.default_timeout) {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(result) => result,
            Err(_) => {
                shared.commit(Outcome::Timeout);
                return Err(CallError::TimedOut(limit));
            }
        },
        None => guarded.await,
    };

    match result {
        Ok(Ok(value)) => {
            shared.commit(Outcome::Success);
            Ok(value)
        }
        Ok(Err(e)) => {
            shared.commit(Outcome::Failure);
            Err(CallError::Failed(e))
        }
        Err(_) => {
            tracing::debug!(breaker = %shared.settings.name, "Command panicked");
            shared.commit(Outcome::Failure);
            Err(CallError::Panicked)
        }
    }
}
