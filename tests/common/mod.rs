//! Shared utilities for breaker integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use circuit_breaker::{Breaker, BreakerConfig, Completion, Dispatch, Snapshot, Transition};

/// Everything the hooks of a breaker reported.
#[derive(Clone, Default)]
pub struct Recorder {
    pub opens: Arc<Mutex<Vec<Snapshot>>>,
    pub closes: Arc<Mutex<Vec<Snapshot>>>,
    pub transitions: Arc<Mutex<Vec<Transition>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn opens(&self) -> Vec<Snapshot> {
        self.opens.lock().unwrap().clone()
    }

    pub fn closes(&self) -> Vec<Snapshot> {
        self.closes.lock().unwrap().clone()
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().unwrap().clone()
    }
}

/// Build a breaker whose hooks feed a [`Recorder`].
pub fn recorded_breaker(config: BreakerConfig, autostart: bool) -> (Breaker, Recorder) {
    let recorder = Recorder::default();
    let opens = recorder.opens.clone();
    let closes = recorder.closes.clone();
    let transitions = recorder.transitions.clone();

    let breaker = Breaker::builder(config)
        .autostart(autostart)
        .on_open(move |snapshot| opens.lock().unwrap().push(*snapshot))
        .on_close(move |snapshot| closes.lock().unwrap().push(*snapshot))
        .on_transition(move |transition| transitions.lock().unwrap().push(*transition))
        .build();
    (breaker, recorder)
}

/// Window of one second split into ten buckets of 100ms.
#[allow(dead_code)]
pub fn fast_config(name: &str) -> BreakerConfig {
    BreakerConfig::named(name)
        .sliding_time_window(Duration::from_secs(1))
        .buckets_number(10)
}

/// Run a command that reports success synchronously.
#[allow(dead_code)]
pub fn succeed(breaker: &Breaker) -> Dispatch {
    breaker.run(
        |done: Completion| {
            let _ = done.success();
            Ok::<_, ()>(())
        },
        || (),
        None,
    )
}

/// Run a command that raises a fault before reporting anything.
#[allow(dead_code)]
pub fn fail(breaker: &Breaker) -> Dispatch {
    breaker.run(|_| Err::<(), _>("dependency down"), || (), None)
}

/// Open a breaker built with default thresholds by failing past calibration.
#[allow(dead_code)]
pub fn trip(breaker: &Breaker) {
    for _ in 0..6 {
        fail(breaker);
    }
    assert!(breaker.is_open());
}
