//! Metrics collection and exposition.
//!
//! # Metrics
//! - `circuit_breaker_calls_total` (counter): calls by breaker, outcome
//! - `circuit_breaker_transitions_total` (counter): state changes by breaker, from, to
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//!
//! Recording goes through the `metrics` facade and is a no-op until an
//! exporter is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use thiserror::Error;

use crate::resilience::State;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus exporter: {0}")]
    Install(#[from] BuildError),
}

/// Outcome label for `circuit_breaker_calls_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    Rejected,
    ProbeSuccess,
    ProbeFailure,
    ProbeTimeout,
    ProbeCancelled,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Rejected => "rejected",
            CallOutcome::ProbeSuccess => "probe_success",
            CallOutcome::ProbeFailure => "probe_failure",
            CallOutcome::ProbeTimeout => "probe_timeout",
            CallOutcome::ProbeCancelled => "probe_cancelled",
        }
    }
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_call(breaker: &str, outcome: CallOutcome) {
    metrics::counter!(
        "circuit_breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_transition(breaker: &str, from: State, to: State) {
    metrics::counter!(
        "circuit_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    record_state(breaker, to);
}

pub fn record_state(breaker: &str, state: State) {
    metrics::gauge!("circuit_breaker_state", "breaker" => breaker.to_string()).set(state as u8 as f64);
}
