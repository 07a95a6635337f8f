//! Breaker state, snapshot and error definitions.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Normal operation, every call invokes the operation.
    Closed = 0,
    /// Fast-failing, the operation is not invoked.
    Open = 1,
    /// A single bounded probe decides the next state.
    HalfOpen = 2,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half_open",
        }
    }

    /// Whether `self → next` is an edge of the state machine.
    pub fn can_transition_to(self, next: State) -> bool {
        matches!(
            (self, next),
            (State::Closed, State::Open)
                | (State::Open, State::HalfOpen)
                | (State::HalfOpen, State::Closed)
                | (State::HalfOpen, State::Open)
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`CircuitBreaker::execute`](crate::CircuitBreaker::execute).
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker rejected the call, or the recovery probe failed.
    #[error("circuit breaker is open")]
    Open,

    /// The operation ran and failed. The error is passed through untouched.
    #[error("{0}")]
    Operation(E),

    /// The state machine attempted an edge it does not have.
    #[error("invalid circuit breaker state")]
    InvalidState,
}

impl<E> BreakerError<E> {
    /// True when the breaker intervened rather than the dependency failing.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open)
    }

    /// The operation's own error, if that is what this is.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// An attempted edge the state machine does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: State,
    pub to: State,
}

impl<E> From<InvalidTransition> for BreakerError<E> {
    fn from(_: InvalidTransition) -> Self {
        BreakerError::InvalidState
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: State,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub recovery_time: Duration,
    pub last_state_transition: Instant,
    /// `None` until the first successful call.
    pub last_successful_invoke: Option<Instant>,
}

impl BreakerSnapshot {
    /// Time spent in the current state.
    pub fn time_in_state(&self) -> Duration {
        self.last_state_transition.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_defined_edges_are_allowed() {
        assert!(State::Closed.can_transition_to(State::Open));
        assert!(State::Open.can_transition_to(State::HalfOpen));
        assert!(State::HalfOpen.can_transition_to(State::Closed));
        assert!(State::HalfOpen.can_transition_to(State::Open));

        assert!(!State::Closed.can_transition_to(State::HalfOpen));
        assert!(!State::HalfOpen.can_transition_to(State::HalfOpen));
        assert!(!State::Open.can_transition_to(State::Closed));
        assert!(!State::Closed.can_transition_to(State::Closed));
    }

    #[test]
    fn operation_error_displays_verbatim() {
        let err: BreakerError<String> = BreakerError::Operation("connection refused".into());
        assert_eq!(err.to_string(), "connection refused");
        assert!(!err.is_open());
        assert_eq!(err.into_operation().as_deref(), Some("connection refused"));

        let open: BreakerError<String> = BreakerError::Open;
        assert_eq!(open.to_string(), "circuit breaker is open");
        assert!(open.is_open());
        assert!(open.into_operation().is_none());
    }
}
