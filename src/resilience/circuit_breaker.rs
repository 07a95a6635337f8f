//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a single probe tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures reach failure_threshold
//! Open → Half-Open: first call after recovery_time (the call becomes the probe)
//! Half-Open → Closed: probe succeeds within recovery_time
//! Half-Open → Open: probe fails, panics, exceeds recovery_time or its caller goes away
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency (see `registry.rs` for the name → breaker map)
//! - Recovery is noticed lazily by the next caller; no background timer task
//! - The lock is held for the whole call, so outcomes are recorded in call order
//! - The probe runs on its own task and is abandoned, not aborted, on timeout
//! - A probe always settles before the lock is released; a dropped probe
//!   reopens the breaker, so callers never observe Half-Open

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{BreakerConfig, ValidationError};
use crate::observability::metrics::{self, CallOutcome};
use crate::resilience::timeouts::{run_with_deadline, DeadlineOutcome};
use crate::resilience::types::{BreakerError, BreakerSnapshot, InvalidTransition, State};

#[derive(Debug)]
struct Inner {
    state: State,
    consecutive_failures: u32,
    last_state_transition: Instant,
    last_successful_invoke: Option<Instant>,
}

/// Guards a single unreliable dependency.
///
/// Share it across tasks behind an `Arc`. Every [`execute`](Self::execute)
/// call holds the breaker's lock until the call finishes.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_time: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create an unnamed breaker. Both parameters must be positive.
    pub fn new(
        failure_threshold: u32,
        recovery_time: Duration,
    ) -> Result<Self, Vec<ValidationError>> {
        Self::with_name("default", failure_threshold, recovery_time)
    }

    /// Create a breaker from its configuration entry.
    pub fn from_config(config: &BreakerConfig) -> Result<Self, Vec<ValidationError>> {
        Self::with_name(&config.name, config.failure_threshold, config.recovery_time())
    }

    pub fn with_name(
        name: &str,
        failure_threshold: u32,
        recovery_time: Duration,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyBreakerName);
        }
        if failure_threshold == 0 {
            errors.push(ValidationError::ZeroFailureThreshold(name.to_string()));
        }
        if recovery_time.is_zero() {
            errors.push(ValidationError::ZeroRecoveryTime(name.to_string()));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        metrics::record_state(name, State::Closed);

        Ok(Self {
            name: name.to_string(),
            failure_threshold,
            recovery_time,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                last_state_transition: Instant::now(),
                last_successful_invoke: None,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_time(&self) -> Duration {
        self.recovery_time
    }

    /// Run `operation` through the breaker.
    ///
    /// Returns the operation's value on success. Returns
    /// [`BreakerError::Open`] when the call is rejected without running the
    /// operation, and also when a recovery probe fails or times out. Returns
    /// [`BreakerError::Operation`] with the untouched error when the
    /// operation ran in the closed state and failed.
    ///
    /// The operation's future must be `'static` because a probe is spawned
    /// onto its own task so that it can be abandoned at the deadline.
    ///
    /// Dropping the returned future mid-probe counts as a failed probe: the
    /// breaker reopens and a fresh cool-down starts.
    ///
    /// # Panics
    ///
    /// A panic in a closed-state operation propagates to the caller and is
    /// not counted as a failure. A panicking probe is caught and reopens.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let mut inner = self.inner.lock().await;

        match inner.state {
            State::Closed => {
                if inner.consecutive_failures >= self.failure_threshold {
                    self.transition(&mut inner, State::Open)?;
                    return Err(self.reject(&inner));
                }
                self.call(&mut inner, operation).await
            }
            State::Open => {
                if inner.last_state_transition.elapsed() < self.recovery_time {
                    return Err(self.reject(&inner));
                }
                self.transition(&mut inner, State::HalfOpen)?;
                inner.consecutive_failures = 0;
                self.probe(&mut inner, operation).await
            }
            State::HalfOpen => {
                tracing::error!(breaker = %self.name, "Breaker is half-open outside a probe");
                self.reopen(&mut inner, CallOutcome::ProbeCancelled)?;
                Err(BreakerError::InvalidState)
            }
        }
    }

    /// Read the current state under the lock.
    pub async fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock().await;
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            failure_threshold: self.failure_threshold,
            recovery_time: self.recovery_time,
            last_state_transition: inner.last_state_transition,
            last_successful_invoke: inner.last_successful_invoke,
        }
    }

    async fn call<F, Fut, T, E>(&self, inner: &mut Inner, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match operation().await {
            Ok(value) => {
                inner.consecutive_failures = 0;
                inner.last_successful_invoke = Some(Instant::now());
                metrics::record_call(&self.name, CallOutcome::Success);
                Ok(value)
            }
            Err(e) => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                metrics::record_call(&self.name, CallOutcome::Failure);
                tracing::debug!(
                    breaker = %self.name,
                    consecutive_failures = inner.consecutive_failures,
                    error = %e,
                    "Operation failed"
                );
                if inner.consecutive_failures >= self.failure_threshold {
                    self.transition(inner, State::Open)?;
                }
                Err(BreakerError::Operation(e))
            }
        }
    }

    async fn probe<F, Fut, T, E>(&self, inner: &mut Inner, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let mut guard = ProbeGuard {
            breaker: self,
            inner,
            settled: false,
        };
        let outcome = run_with_deadline(self.recovery_time, operation()).await;
        guard.settled = true;
        let inner = &mut *guard.inner;

        match outcome {
            DeadlineOutcome::Completed(Ok(value)) => {
                self.transition(inner, State::Closed)?;
                inner.consecutive_failures = 0;
                inner.last_successful_invoke = Some(Instant::now());
                metrics::record_call(&self.name, CallOutcome::ProbeSuccess);
                tracing::info!(breaker = %self.name, "Probe succeeded");
                Ok(value)
            }
            DeadlineOutcome::Completed(Err(e)) => {
                tracing::warn!(breaker = %self.name, error = %e, "Probe failed");
                self.reopen(inner, CallOutcome::ProbeFailure)?;
                Err(BreakerError::Open)
            }
            DeadlineOutcome::TimedOut => {
                tracing::warn!(
                    breaker = %self.name,
                    timeout_ms = self.recovery_time.as_millis() as u64,
                    "Probe timed out"
                );
                self.reopen(inner, CallOutcome::ProbeTimeout)?;
                Err(BreakerError::Open)
            }
            DeadlineOutcome::Panicked | DeadlineOutcome::Cancelled => {
                self.reopen(inner, CallOutcome::ProbeFailure)?;
                Err(BreakerError::Open)
            }
        }
    }

    fn reopen(&self, inner: &mut Inner, outcome: CallOutcome) -> Result<(), InvalidTransition> {
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        self.transition(inner, State::Open)?;
        metrics::record_call(&self.name, outcome);
        Ok(())
    }

    fn reject<E>(&self, inner: &Inner) -> BreakerError<E> {
        let remaining = self
            .recovery_time
            .saturating_sub(inner.last_state_transition.elapsed());
        tracing::debug!(
            breaker = %self.name,
            retry_in_ms = remaining.as_millis() as u64,
            "Call rejected, breaker open"
        );
        metrics::record_call(&self.name, CallOutcome::Rejected);
        BreakerError::Open
    }

    fn transition(&self, inner: &mut Inner, next: State) -> Result<(), InvalidTransition> {
        let from = inner.state;
        if !from.can_transition_to(next) {
            tracing::error!(breaker = %self.name, from = %from, to = %next, "Invalid state transition");
            return Err(InvalidTransition { from, to: next });
        }

        inner.state = next;
        inner.last_state_transition = Instant::now();
        metrics::record_transition(&self.name, from, next);

        if next == State::Open {
            tracing::warn!(
                breaker = %self.name,
                from = %from,
                to = %next,
                consecutive_failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
        } else {
            tracing::info!(
                breaker = %self.name,
                from = %from,
                to = %next,
                consecutive_failures = inner.consecutive_failures,
                "Circuit breaker state changed"
            );
        }
        Ok(())
    }
}

/// Reopens the breaker if a probe is dropped before its outcome is recorded.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    inner: &'a mut Inner,
    settled: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!(breaker = %self.breaker.name, "Probe abandoned by its caller");
        // An invalid edge is already logged by `transition`.
        let _ = self.breaker.reopen(self.inner, CallOutcome::ProbeCancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fail() -> Result<(), String> {
        Err("boom".to_string())
    }

    async fn succeed() -> Result<(), String> {
        Ok(())
    }

    async fn must_not_run() -> Result<(), String> {
        panic!("operation must not run")
    }

    #[test]
    fn rejects_non_positive_parameters() {
        let errors = CircuitBreaker::new(0, Duration::ZERO).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroFailureThreshold("default".into()),
                ValidationError::ZeroRecoveryTime("default".into()),
            ]
        );

        assert!(CircuitBreaker::with_name(" ", 1, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn starts_closed() {
        let cb = CircuitBreaker::from_config(&BreakerConfig::new("db", 2, Duration::from_secs(1)))
            .unwrap();
        let snap = cb.snapshot().await;
        assert_eq!(snap.name, "db");
        assert_eq!(snap.state, State::Closed);
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.last_successful_invoke, None);
    }

    #[tokio::test(start_paused = true)]
    async fn reaching_threshold_opens_immediately() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(5)).unwrap();

        assert!(matches!(cb.execute(fail).await, Err(BreakerError::Operation(_))));
        assert_eq!(cb.snapshot().await.state, State::Closed);
        assert!(matches!(cb.execute(fail).await, Err(BreakerError::Operation(_))));

        let snap = cb.snapshot().await;
        assert_eq!(snap.state, State::Open);
        assert_eq!(snap.consecutive_failures, 2);
        assert_eq!(snap.last_state_transition, Instant::now());
    }

    #[tokio::test]
    async fn success_updates_last_invoke() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(5)).unwrap();
        cb.execute(succeed).await.unwrap();
        let snap = cb.snapshot().await;
        assert!(snap.last_successful_invoke.is_some());
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn lingering_threshold_in_closed_is_rejected_without_call() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(5)).unwrap();
        cb.inner.lock().await.consecutive_failures = 1;

        let res = cb.execute(must_not_run).await;
        assert!(matches!(res, Err(BreakerError::Open)));
        assert_eq!(cb.snapshot().await.state, State::Open);
    }

    #[tokio::test]
    async fn invalid_edge_is_surfaced() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(5)).unwrap();
        let mut inner = cb.inner.lock().await;
        let before = inner.last_state_transition;

        let err = cb.transition(&mut inner, State::HalfOpen).unwrap_err();
        assert_eq!(err, InvalidTransition { from: State::Closed, to: State::HalfOpen });
        assert!(matches!(BreakerError::<String>::from(err), BreakerError::InvalidState));
        assert_eq!(inner.state, State::Closed);
        assert_eq!(inner.last_state_transition, before);
    }

    #[tokio::test]
    async fn stray_half_open_is_invalid_and_reopens() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(5)).unwrap();
        cb.inner.lock().await.state = State::HalfOpen;

        let res = cb.execute(must_not_run).await;
        assert!(matches!(res, Err(BreakerError::InvalidState)));

        let snap = cb.snapshot().await;
        assert_eq!(snap.state, State::Open);
        assert_eq!(snap.consecutive_failures, 1);
        assert!(matches!(cb.execute(must_not_run).await, Err(BreakerError::Open)));
    }

    #[tokio::test]
    async fn closed_state_panic_propagates_uncounted() {
        let cb = std::sync::Arc::new(CircuitBreaker::new(1, Duration::from_secs(5)).unwrap());
        let task = tokio::spawn({
            let cb = cb.clone();
            async move {
                cb.execute(|| async {
                    if true {
                        panic!("operation blew up");
                    }
                    Ok::<(), String>(())
                })
                .await
            }
        });
        assert!(task.await.unwrap_err().is_panic());

        let snap = cb.snapshot().await;
        assert_eq!(snap.state, State::Closed);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_recovery_call_reopens() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(5)).unwrap();
        assert!(cb.execute(fail).await.is_err());
        tokio::time::advance(Duration::from_secs(5)).await;

        let pending = tokio::time::timeout(
            Duration::from_millis(10),
            cb.execute(|| std::future::pending::<Result<(), String>>()),
        )
        .await;
        assert!(pending.is_err());

        let snap = cb.snapshot().await;
        assert_eq!(snap.state, State::Open);
        assert_eq!(snap.consecutive_failures, 1);
        assert_eq!(snap.last_state_transition, Instant::now());
    }
}
