//! Timeout enforcement for recovery probes.
//!
//! # Responsibilities
//! - Run a probe on its own task with a deadline
//! - Report completion, timeout, panic and cancellation as distinct outcomes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Every call spawns a fresh task, so a late result from an abandoned
//!   probe has nowhere to land except its own dropped handle
//! - On timeout the task is detached, not aborted; it runs to completion

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinError;
use tokio::time;

/// How a deadline-bounded run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum DeadlineOutcome<T> {
    Completed(T),
    TimedOut,
    Panicked,
    /// The task was cancelled, e.g. by runtime shutdown.
    Cancelled,
}

/// Spawn `fut` and wait at most `deadline` for it.
pub async fn run_with_deadline<F>(deadline: Duration, fut: F) -> DeadlineOutcome<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = tokio::spawn(fut);

    match time::timeout(deadline, handle).await {
        Ok(Ok(output)) => DeadlineOutcome::Completed(output),
        Ok(Err(e)) => join_failure(e),
        // Dropping the JoinHandle detaches the task.
        Err(_) => DeadlineOutcome::TimedOut,
    }
}

fn join_failure<T>(e: JoinError) -> DeadlineOutcome<T> {
    if e.is_panic() {
        tracing::error!(error = %e, "Probe task panicked");
        DeadlineOutcome::Panicked
    } else {
        tracing::warn!(error = %e, "Probe task was cancelled");
        DeadlineOutcome::Cancelled
    }
}
