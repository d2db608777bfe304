//! Breaker state machine.

use serde::Serialize;

use crate::window::{Bucket, Snapshot};

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl State {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::HalfOpen => "half_open",
            State::Open => "open",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    /// Error rate exceeded tolerance with enough samples.
    Threshold,
    /// The half-open probe measurement came in.
    Probe,
    /// The window completed a full rotation cycle while open.
    Rollover,
    /// `open()` or `close()` was called.
    Manual,
    /// `reset()` restored the state remembered by an override.
    Reset,
}

impl Cause {
    pub fn as_str(self) -> &'static str {
        match self {
            Cause::Threshold => "threshold",
            Cause::Probe => "probe",
            Cause::Rollover => "rollover",
            Cause::Manual => "manual",
            Cause::Reset => "reset",
        }
    }
}

/// A state change, with the window snapshot that drove it.
///
/// A threshold breach measured while already open is reported as an
/// `Open -> Open` transition so the breach still reaches `on_open`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub cause: Cause,
    pub snapshot: Snapshot,
}

impl Transition {
    /// False for a breach re-reported while already open.
    pub fn is_state_change(&self) -> bool {
        self.from != self.to
    }
}

/// Limits that decide when a closed breaker opens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Error percentage that must be exceeded.
    pub tolerance_percent: f64,
    /// Number of measured calls that must be exceeded.
    pub calibration_count: u64,
}

impl Thresholds {
    /// Whether `snapshot` breaches both limits.
    pub fn breached(&self, snapshot: &Snapshot) -> bool {
        snapshot.total > self.calibration_count && snapshot.percent > self.tolerance_percent
    }
}

/// Current state plus the optional manual override.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: State,
    forced: Option<State>,
    thresholds: Thresholds,
}

impl StateMachine {
    /// Create a closed state machine.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            state: State::Closed,
            forced: None,
            thresholds,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }

    /// Whether a manual override is active.
    pub fn is_forced(&self) -> bool {
        self.forced.is_some()
    }

    /// State remembered by the active override, if any.
    pub fn forced(&self) -> Option<State> {
        self.forced
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Re-evaluate after a measurement was committed.
    ///
    /// `current` is the bucket that just received the measurement and
    /// `snapshot` the window aggregate including it. Does nothing while an
    /// override is active.
    pub fn on_measurement(&mut self, current: &Bucket, snapshot: Snapshot) -> Option<Transition> {
        if self.is_forced() {
            return None;
        }

        match self.state {
            State::HalfOpen => {
                let last_failed = current.success == 0 && snapshot.error > 0;
                let to = if last_failed { State::Open } else { State::Closed };
                self.transition(to, Cause::Probe, snapshot)
            }
            State::Closed => {
                if self.thresholds.breached(&snapshot) {
                    self.transition(State::Open, Cause::Threshold, snapshot)
                } else {
                    None
                }
            }
            // late outcomes of calls started before the trip land here
            State::Open => self.thresholds.breached(&snapshot).then_some(Transition {
                from: State::Open,
                to: State::Open,
                cause: Cause::Threshold,
                snapshot,
            }),
        }
    }

    /// Let an open breaker probe again after a full-window rollover.
    pub fn on_rollover(&mut self, snapshot: Snapshot) -> Option<Transition> {
        if self.is_forced() || self.state != State::Open {
            return None;
        }
        self.transition(State::HalfOpen, Cause::Rollover, snapshot)
    }

    /// Force the breaker open until `reset`.
    pub fn force_open(&mut self, snapshot: Snapshot) -> Option<Transition> {
        self.force(State::Open, snapshot)
    }

    /// Force the breaker closed until `reset`.
    pub fn force_close(&mut self, snapshot: Snapshot) -> Option<Transition> {
        self.force(State::Closed, snapshot)
    }

    fn force(&mut self, to: State, snapshot: Snapshot) -> Option<Transition> {
        if self.forced.is_none() {
            self.forced = Some(self.state);
        }
        self.transition(to, Cause::Manual, snapshot)
    }

    /// Restore the state remembered by the override. No-op without one.
    pub fn reset(&mut self, snapshot: Snapshot) -> Option<Transition> {
        let restored = self.forced.take()?;
        self.transition(restored, Cause::Reset, snapshot)
    }

    fn transition(&mut self, to: State, cause: Cause, snapshot: Snapshot) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        Some(Transition { from, to, cause, snapshot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> Thresholds {
        Thresholds {
            tolerance_percent: 50.0,
            calibration_count: 5,
        }
    }

    fn snapshot(total: u64, error: u64) -> Snapshot {
        Snapshot::from_totals(&Bucket {
            success: total - error,
            failure: error,
            ..Bucket::default()
        })
    }

    fn failing_bucket() -> Bucket {
        Bucket { failure: 1, ..Bucket::default() }
    }

    fn open_machine() -> StateMachine {
        let mut machine = StateMachine::new(thresholds());
        machine.on_measurement(&failing_bucket(), snapshot(6, 6));
        assert_eq!(machine.state(), State::Open);
        machine
    }

    #[test]
    fn test_calibration_guards_small_samples() {
        let mut machine = StateMachine::new(thresholds());
        for total in 1..=5 {
            assert!(machine.on_measurement(&failing_bucket(), snapshot(total, total)).is_none());
        }
        assert_eq!(machine.state(), State::Closed);

        let transition = machine
            .on_measurement(&failing_bucket(), snapshot(6, 6))
            .expect("breach opens");
        assert_eq!(transition.from, State::Closed);
        assert_eq!(transition.to, State::Open);
        assert_eq!(transition.cause, Cause::Threshold);
    }

    #[test]
    fn test_tolerance_must_be_exceeded() {
        let mut machine = StateMachine::new(thresholds());
        // exactly 50% does not open
        assert!(machine.on_measurement(&failing_bucket(), snapshot(10, 5)).is_none());
        assert!(machine.on_measurement(&failing_bucket(), snapshot(10, 6)).is_some());
    }

    #[test]
    fn test_rollover_only_affects_open() {
        let mut machine = StateMachine::new(thresholds());
        assert!(machine.on_rollover(Snapshot::empty()).is_none());
        assert_eq!(machine.state(), State::Closed);

        let mut machine = open_machine();
        let transition = machine.on_rollover(Snapshot::empty()).expect("half-open");
        assert_eq!(transition.to, State::HalfOpen);
        assert_eq!(transition.cause, Cause::Rollover);
    }

    #[test]
    fn test_half_open_success_closes() {
        let mut machine = open_machine();
        machine.on_rollover(snapshot(6, 6));

        let current = Bucket { success: 1, ..Bucket::default() };
        let transition = machine.on_measurement(&current, snapshot(7, 6)).expect("probe");
        assert_eq!(transition.to, State::Closed);
        assert_eq!(transition.cause, Cause::Probe);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let mut machine = open_machine();
        machine.on_rollover(snapshot(6, 6));

        let transition = machine
            .on_measurement(&failing_bucket(), snapshot(7, 7))
            .expect("probe");
        assert_eq!(transition.to, State::Open);
    }

    #[test]
    fn test_half_open_measurement_without_errors_closes() {
        let mut machine = open_machine();
        machine.on_rollover(Snapshot::empty());

        let transition = machine
            .on_measurement(&Bucket::default(), Snapshot::empty())
            .expect("probe");
        assert_eq!(transition.to, State::Closed);
    }

    #[test]
    fn test_override_suspends_automatic_rules() {
        let mut machine = StateMachine::new(thresholds());
        machine.force_open(Snapshot::empty());
        assert!(machine.is_open());
        assert_eq!(machine.forced(), Some(State::Closed));

        let healthy = Bucket { success: 1, ..Bucket::default() };
        assert!(machine.on_measurement(&healthy, snapshot(10, 0)).is_none());
        assert!(machine.on_rollover(Snapshot::empty()).is_none());
        assert!(machine.is_open());

        let transition = machine.reset(Snapshot::empty()).expect("restored");
        assert_eq!(transition.to, State::Closed);
        assert_eq!(transition.cause, Cause::Reset);
        assert!(!machine.is_forced());
    }

    #[test]
    fn test_nested_override_keeps_first_state() {
        let mut machine = open_machine();
        machine.force_close(Snapshot::empty());
        machine.force_open(Snapshot::empty());
        machine.force_close(Snapshot::empty());
        assert_eq!(machine.forced(), Some(State::Open));

        machine.reset(Snapshot::empty());
        assert_eq!(machine.state(), State::Open);
    }

    #[test]
    fn test_reset_without_override_is_noop() {
        let mut machine = open_machine();
        assert!(machine.reset(Snapshot::empty()).is_none());
        assert_eq!(machine.state(), State::Open);
    }

    #[test]
    fn test_breach_while_open_is_reported_again() {
        let mut machine = open_machine();
        let breach = machine
            .on_measurement(&failing_bucket(), snapshot(8, 8))
            .expect("breach");
        assert_eq!(breach.from, State::Open);
        assert_eq!(breach.to, State::Open);
        assert_eq!(breach.cause, Cause::Threshold);
        assert!(!breach.is_state_change());
        assert!(machine.is_open());
    }

    #[test]
    fn test_open_without_breach_reports_nothing() {
        let mut machine = open_machine();
        let healthy = Bucket { success: 1, ..Bucket::default() };
        assert!(machine.on_measurement(&healthy, snapshot(20, 8)).is_none());
        assert!(machine.is_open());
    }
}
