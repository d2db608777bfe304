//! Circuit breaker facade.
//!
//! # Responsibilities
//! - Own the window, the state machine and the resolved settings
//! - Serialize every mutation behind one lock
//! - Run the rotation task for the breaker's lifetime
//! - Publish transitions to logs, metrics and user hooks
//!
//! # Design Decisions
//! - `Breaker` is a cheap handle; clones share one breaker
//! - Hooks run after the lock is released, so they may call back in
//! - No global registry: every breaker is built and owned by its caller

mod rotation;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;

use crate::config::{BreakerConfig, Settings};
use crate::executor::{self, CallError, Completion, Dispatch, Outcome};
use crate::observability::metrics;
use crate::state::{Cause, State, StateMachine, Thresholds, Transition};
use crate::window::{Bucket, Event, Snapshot, TimeWindow};

use rotation::Rotation;

/// Errors from breaker lifecycle operations.
#[derive(Debug, Error)]
pub enum BreakerError {
    #[error("no Tokio runtime available to drive bucket rotation")]
    NoRuntime,
}

type SnapshotHook = Arc<dyn Fn(&Snapshot) + Send + Sync>;
type TransitionHook = Arc<dyn Fn(&Transition) + Send + Sync>;

struct Hooks {
    on_open: SnapshotHook,
    on_close: SnapshotHook,
    on_transition: Option<TransitionHook>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            on_open: Arc::new(|_| {}),
            on_close: Arc::new(|_| {}),
            on_transition: None,
        }
    }
}

struct Core {
    window: TimeWindow,
    machine: StateMachine,
}

/// State shared by breaker handles, invocations and the rotation task.
pub(crate) struct Shared {
    pub(crate) settings: Settings,
    pub(crate) runtime: Option<Handle>,
    core: Mutex<Core>,
    hooks: Hooks,
    rotation: Mutex<Option<Rotation>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.lock().machine.is_open()
    }

    pub(crate) fn record_outage(&self) {
        self.lock().window.record(Event::Outage);
        metrics::record_event(&self.settings.name, Event::Outage);
    }

    /// Record a measurement and re-evaluate the state unless overridden.
    pub(crate) fn commit(&self, outcome: Outcome) {
        let event = Event::from(outcome);
        let transition = {
            let mut core = self.lock();
            core.window.record(event);
            let current = core.window.current();
            let snapshot = core.window.snapshot();
            core.machine.on_measurement(&current, snapshot)
        };

        metrics::record_event(&self.settings.name, event);
        if let Some(transition) = transition {
            self.publish(transition);
        }
    }

    pub(crate) fn rotate(&self) {
        let transition = {
            let mut core = self.lock();
            if core.window.rotate() {
                let snapshot = core.window.snapshot();
                tracing::debug!(
                    breaker = %self.settings.name,
                    state = %core.machine.state(),
                    total = snapshot.total,
                    "Sliding window rolled over"
                );
                core.machine.on_rollover(snapshot)
            } else {
                None
            }
        };

        metrics::record_rotation(&self.settings.name);
        if let Some(transition) = transition {
            self.publish(transition);
        }
    }

    fn publish(&self, transition: Transition) {
        if !transition.is_state_change() {
            tracing::debug!(
                breaker = %self.settings.name,
                total = transition.snapshot.total,
                error = transition.snapshot.error,
                percent = transition.snapshot.percent,
                "Threshold breached while open"
            );
            (self.hooks.on_open)(&transition.snapshot);
            return;
        }

        tracing::info!(
            breaker = %self.settings.name,
            from = %transition.from,
            to = %transition.to,
            cause = transition.cause.as_str(),
            total = transition.snapshot.total,
            error = transition.snapshot.error,
            percent = transition.snapshot.percent,
            "Circuit breaker state changed"
        );
        metrics::record_transition(&self.settings.name, &transition);

        match (transition.cause, transition.to) {
            (Cause::Threshold, State::Open) => (self.hooks.on_open)(&transition.snapshot),
            (Cause::Probe, State::Closed) => (self.hooks.on_close)(&transition.snapshot),
            _ => {}
        }
        if let Some(hook) = &self.hooks.on_transition {
            hook(&transition);
        }
    }
}

/// Builder for a [`Breaker`] with lifecycle hooks.
pub struct BreakerBuilder {
    config: BreakerConfig,
    hooks: Hooks,
    autostart: bool,
}

impl BreakerBuilder {
    /// Called with the window snapshot when the error rate breaches the
    /// thresholds: on opening, and again for each breach measured while open.
    pub fn on_open(mut self, hook: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.hooks.on_open = Arc::new(hook);
        self
    }

    /// Called with the window snapshot when a half-open probe closes the breaker.
    pub fn on_close(mut self, hook: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.hooks.on_close = Arc::new(hook);
        self
    }

    /// Called for every state change, manual ones included. Breaches while
    /// already open are not state changes and only reach `on_open`.
    pub fn on_transition(mut self, hook: impl Fn(&Transition) + Send + Sync + 'static) -> Self {
        self.hooks.on_transition = Some(Arc::new(hook));
        self
    }

    /// Whether `build` starts the rotation task (default: true).
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn build(self) -> Breaker {
        let (settings, adjustments) = self.config.resolve_with_report();
        for adjustment in &adjustments {
            tracing::debug!(breaker = %settings.name, %adjustment, "Configuration value defaulted");
        }

        let thresholds = Thresholds {
            tolerance_percent: settings.tolerance_percent,
            calibration_count: settings.calibration_count,
        };
        let core = Core {
            window: TimeWindow::new(settings.buckets_number),
            machine: StateMachine::new(thresholds),
        };

        let breaker = Breaker {
            shared: Arc::new(Shared {
                runtime: Handle::try_current().ok(),
                settings,
                core: Mutex::new(core),
                hooks: self.hooks,
                rotation: Mutex::new(None),
            }),
        };
        metrics::record_state(breaker.name(), State::Closed);

        if self.autostart {
            if let Err(e) = breaker.start() {
                tracing::debug!(breaker = %breaker.name(), error = %e, "Rotation not started");
            }
        }
        breaker
    }
}

/// A circuit breaker guarding one dependency.
#[derive(Clone)]
pub struct Breaker {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Breaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breaker")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("forced", &self.is_forced())
            .finish()
    }
}

impl Breaker {
    /// Build a breaker with no-op hooks and start its rotation task.
    ///
    /// Rotation only starts when called inside a Tokio runtime; otherwise
    /// call [`Breaker::start`] later from one.
    pub fn new(config: BreakerConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: BreakerConfig) -> BreakerBuilder {
        BreakerBuilder {
            config,
            hooks: Hooks::default(),
            autostart: true,
        }
    }

    /// Run `command` unless the breaker is open, in which case run `fallback`.
    ///
    /// The command receives a [`Completion`] and must report through it at
    /// most once, possibly later and from another task. Returning `Err` or
    /// panicking counts as a failure. A positive `timeout` overrides the
    /// configured default. Whatever `fallback` returns is discarded, and a
    /// panicking fallback is caught.
    pub fn run<C, E, F, R>(&self, command: C, fallback: F, timeout: Option<Duration>) -> Dispatch
    where
        C: FnOnce(Completion) -> Result<(), E>,
        F: FnOnce() -> R,
    {
        executor::run(&self.shared, command, fallback, timeout)
    }

    /// Await `command` unless the breaker is open.
    ///
    /// `Ok` counts as success, `Err` or a panic as failure, and exceeding the
    /// timeout as a timeout. An open breaker records an outage and returns
    /// [`CallError::Rejected`].
    pub async fn call<F, Fut, T, E>(
        &self,
        command: F,
        timeout: Option<Duration>,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        executor::call::call(&self.shared, command, timeout).await
    }

    /// Like [`Breaker::call`], but an open breaker yields `fallback`'s value.
    /// A panicking fallback still counts as an outage and yields
    /// [`CallError::Rejected`].
    pub async fn call_with_fallback<F, Fut, T, E, G, GFut>(
        &self,
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
        executor::call::call_with_fallback(&self.shared, command, fallback, timeout).await
    }

    /// Force the breaker open until [`Breaker::reset`].
    pub fn open(&self) {
        self.manual(|machine, snapshot| machine.force_open(snapshot));
    }

    /// Force the breaker closed until [`Breaker::reset`].
    pub fn close(&self) {
        self.manual(|machine, snapshot| machine.force_close(snapshot));
    }

    /// Drop a manual override and restore the state it replaced.
    /// Does nothing when no override is active.
    pub fn reset(&self) {
        self.manual(|machine, snapshot| machine.reset(snapshot));
    }

    fn manual(&self, apply: impl FnOnce(&mut StateMachine, Snapshot) -> Option<Transition>) {
        let transition = {
            let mut core = self.shared.lock();
            let snapshot = core.window.snapshot();
            apply(&mut core.machine, snapshot)
        };
        if let Some(transition) = transition {
            self.shared.publish(transition);
        }
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    pub fn state(&self) -> State {
        self.shared.lock().machine.state()
    }

    /// Whether a manual override is active.
    pub fn is_forced(&self) -> bool {
        self.shared.lock().machine.is_forced()
    }

    /// Error statistics over the sliding window.
    pub fn calculate(&self) -> Snapshot {
        self.shared.lock().window.snapshot()
    }

    /// Every counter summed over the window, outages included.
    pub fn totals(&self) -> Bucket {
        self.shared.lock().window.totals()
    }

    /// Rotate the window once, as the background task does on each tick.
    pub fn tick(&self) {
        self.shared.rotate();
    }

    /// Start the rotation task. Does nothing if it is already running.
    pub fn start(&self) -> Result<(), BreakerError> {
        let mut rotation = self
            .shared
            .rotation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if rotation.as_ref().is_some_and(Rotation::is_active) {
            return Ok(());
        }

        let runtime = Handle::try_current()
            .ok()
            .or_else(|| self.shared.runtime.clone())
            .ok_or(BreakerError::NoRuntime)?;
        *rotation = Some(Rotation::spawn(
            &runtime,
            Arc::downgrade(&self.shared),
            self.shared.settings.rotation_period(),
        ));
        Ok(())
    }

    /// Stop the rotation task. The breaker keeps working, its window no
    /// longer slides until [`Breaker::start`] is called again.
    pub fn stop(&self) {
        self.shared
            .rotation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_running(&self) -> bool {
        self.shared
            .rotation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Rotation::is_active)
    }

    pub fn name(&self) -> &str {
        &self.shared.settings.name
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }
}
