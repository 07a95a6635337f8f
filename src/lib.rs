//! Circuit breaker for guarding calls to an unreliable dependency.

pub mod config;
pub mod observability;
pub mod resilience;
pub mod simulation;

pub use config::AppConfig;
pub use resilience::{BreakerError, BreakerRegistry, BreakerSnapshot, CircuitBreaker, State};
