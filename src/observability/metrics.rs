//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_outcomes_total` (counter): events by breaker, outcome
//! - `breaker_transitions_total` (counter): state changes by breaker, from, to
//! - `breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `breaker_rotations_total` (counter): bucket rotations by breaker
//!
//! # Design Decisions
//! - Updates go through the `metrics` facade; cheap no-ops without a recorder
//! - Labels are the breaker name plus a fixed, small set of values

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::state::{State, Transition};
use crate::window::Event;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_event(breaker: &str, event: Event) {
    metrics::counter!(
        "breaker_outcomes_total",
        "breaker" => breaker.to_string(),
        "outcome" => event.as_str()
    )
    .increment(1);
}

pub fn record_transition(breaker: &str, transition: &Transition) {
    metrics::counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => transition.from.as_str(),
        "to" => transition.to.as_str()
    )
    .increment(1);
    record_state(breaker, transition.to);
}

pub fn record_state(breaker: &str, state: State) {
    metrics::gauge!("breaker_state", "breaker" => breaker.to_string()).set(f64::from(state as u8));
}

pub fn record_rotation(breaker: &str) {
    metrics::counter!("breaker_rotations_total", "breaker" => breaker.to_string()).increment(1);
}
