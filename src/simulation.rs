//! Simulated dependency for the demo loop.
//!
//! `FlakyDependency` fails with a configured probability, can be forced
//! down entirely, and counts how often it was actually invoked, which is
//! what a breaker is supposed to keep low during an outage.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::DemoConfig;

/// Error produced by the simulated dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyError {
    pub attempt: u64,
}

impl fmt::Display for DependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency failed on attempt {}", self.attempt)
    }
}

impl std::error::Error for DependencyError {}

#[derive(Debug)]
struct Shared {
    failure_rate: f64,
    latency: Duration,
    forced_down: AtomicBool,
    invocations: AtomicU64,
}

/// Cheaply cloneable handle to a simulated remote dependency.
#[derive(Debug, Clone)]
pub struct FlakyDependency {
    shared: Arc<Shared>,
}

impl FlakyDependency {
    pub fn new(failure_rate: f64, latency: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                failure_rate: failure_rate.clamp(0.0, 1.0),
                latency,
                forced_down: AtomicBool::new(false),
                invocations: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(config: &DemoConfig) -> Self {
        Self::new(config.failure_rate, Duration::from_millis(config.latency_ms))
    }

    /// Make every call fail (`true`) or return to the configured rate.
    pub fn set_down(&self, down: bool) {
        self.shared.forced_down.store(down, Ordering::SeqCst);
    }

    /// Number of times the dependency was actually called.
    pub fn invocations(&self) -> u64 {
        self.shared.invocations.load(Ordering::SeqCst)
    }

    /// A single call. The returned future owns its handle, so it can be
    /// handed straight to `CircuitBreaker::execute`.
    pub fn call(&self) -> impl std::future::Future<Output = Result<(), DependencyError>> + Send + 'static {
        let shared = self.shared.clone();
        async move {
            let attempt = shared.invocations.fetch_add(1, Ordering::SeqCst) + 1;
            if !shared.latency.is_zero() {
                tokio::time::sleep(shared.latency).await;
            }

            let failed = shared.forced_down.load(Ordering::SeqCst)
                || (shared.failure_rate > 0.0 && fastrand::f64() < shared.failure_rate);
            if failed {
                Err(DependencyError { attempt })
            } else {
                Ok(())
            }
        }
    }
}
