//! Background bucket rotation.
//!
//! # Responsibilities
//! - Rotate the window every `sliding_time_window / buckets_number`
//! - Stop on request, or once the breaker itself is gone
//!
//! # Design Decisions
//! - The task holds only a weak reference, so it never keeps a breaker alive
//! - First rotation happens one full period after start
//! - Missed ticks are delayed rather than replayed in a burst

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::breaker::Shared;

/// Coordinator for stopping the rotation loop.
struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

/// A running rotation task. Dropping it stops the task.
pub(crate) struct Rotation {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl Rotation {
    pub(crate) fn spawn(runtime: &Handle, shared: Weak<Shared>, period: Duration) -> Self {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        let task = runtime.spawn(run(shared, period, signal));
        Self { shutdown, task }
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Rotation {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn run(shared: Weak<Shared>, period: Duration, mut shutdown: broadcast::Receiver<()>) {
    let name = match shared.upgrade() {
        Some(shared) => shared.settings.name.clone(),
        None => return,
    };

    tracing::debug!(breaker = %name, period_ms = period.as_millis() as u64, "Rotation task starting");

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.rotate();
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }

    tracing::debug!(breaker = %name, "Rotation task stopped");
}
