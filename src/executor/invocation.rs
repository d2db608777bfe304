//! Per-call completion tracking.
//!
//! # Responsibilities
//! - Hand the command a cloneable, thread-safe completion handle
//! - Accept exactly one outcome per invocation
//! - Own the optional timeout timer and cancel it on completion

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::breaker::Shared;
use crate::window::Event;

/// Result of one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
}

impl From<Outcome> for Event {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => Event::Success,
            Outcome::Failure => Event::Failure,
            Outcome::Timeout => Event::Timeout,
        }
    }
}

/// Returned when an invocation already has its outcome. Safe to ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("invocation {0} already completed")]
    AlreadyCompleted(Uuid),
}

struct Invocation {
    id: Uuid,
    completed: AtomicBool,
    timer: Mutex<Option<AbortHandle>>,
    shared: Arc<Shared>,
}

impl Drop for Invocation {
    fn drop(&mut self) {
        if !self.completed.load(Ordering::Acquire) {
            tracing::debug!(
                breaker = %self.shared.settings.name,
                invocation = %self.id,
                "Invocation dropped without an outcome"
            );
        }
    }
}

/// Handle through which a command reports its outcome.
///
/// Clones share the same invocation: the first `complete` from any clone, or
/// from the timeout timer, is recorded and every later one is ignored.
#[derive(Clone)]
pub struct Completion {
    invocation: Arc<Invocation>,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("id", &self.invocation.id)
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl Completion {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            invocation: Arc::new(Invocation {
                id: Uuid::new_v4(),
                completed: AtomicBool::new(false),
                timer: Mutex::new(None),
                shared,
            }),
        }
    }

    /// Identifier used in logs for this invocation.
    pub fn id(&self) -> Uuid {
        self.invocation.id
    }

    /// Whether an outcome has been recorded.
    pub fn is_completed(&self) -> bool {
        self.invocation.completed.load(Ordering::Acquire)
    }

    /// Record `outcome` if this invocation has none yet.
    pub fn complete(&self, outcome: Outcome) -> Result<(), CompletionError> {
        self.commit(outcome, true)
    }

    pub fn success(&self) -> Result<(), CompletionError> {
        self.complete(Outcome::Success)
    }

    pub fn failure(&self) -> Result<(), CompletionError> {
        self.complete(Outcome::Failure)
    }

    pub fn timeout(&self) -> Result<(), CompletionError> {
        self.complete(Outcome::Timeout)
    }

    fn commit(&self, outcome: Outcome, cancel_timer: bool) -> Result<(), CompletionError> {
        let invocation = &self.invocation;
        if invocation
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CompletionError::AlreadyCompleted(invocation.id));
        }

        let timer = invocation
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            if cancel_timer {
                timer.abort();
            }
        }

        invocation.shared.commit(outcome);
        Ok(())
    }

    /// Start a timer that reports `Timeout` unless the command finishes first.
    pub(crate) fn arm_timeout(&self, timeout: Duration) {
        let Some(runtime) = Handle::try_current()
            .ok()
            .or_else(|| self.invocation.shared.runtime.clone())
        else {
            tracing::warn!(
                breaker = %self.invocation.shared.settings.name,
                invocation = %self.invocation.id,
                "No Tokio runtime available, timeout not armed"
            );
            return;
        };

        let completion = self.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = completion.commit(Outcome::Timeout, false);
        });

        let mut timer = self
            .invocation
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_completed() {
            task.abort();
        } else {
            *timer = Some(task.abort_handle());
        }
    }
}
