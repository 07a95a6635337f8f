//! Shared helpers for breaker integration tests.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use circuit_guard::CircuitBreaker;

/// Error returned by the scripted operations below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unavailable(pub &'static str);

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unavailable: {}", self.0)
    }
}

/// Counts how many times an operation actually ran.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicU32>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// An operation that succeeds immediately.
    pub fn ok(&self) -> impl Future<Output = Result<(), Unavailable>> + Send + 'static {
        let calls = self.clone();
        async move {
            calls.hit();
            Ok(())
        }
    }

    /// An operation that fails immediately.
    pub fn fail(&self) -> impl Future<Output = Result<(), Unavailable>> + Send + 'static {
        let calls = self.clone();
        async move {
            calls.hit();
            Err(Unavailable("scripted failure"))
        }
    }

    /// An operation that succeeds after `delay`.
    #[allow(dead_code)]
    pub fn slow_ok(&self, delay: Duration) -> impl Future<Output = Result<(), Unavailable>> + Send + 'static {
        let calls = self.clone();
        async move {
            calls.hit();
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }

    /// An operation that never completes.
    #[allow(dead_code)]
    pub fn hang(&self) -> impl Future<Output = Result<(), Unavailable>> + Send + 'static {
        let calls = self.clone();
        async move {
            calls.hit();
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}

/// Drive `breaker` open with `threshold` failing calls.
#[allow(dead_code)]
pub async fn trip(breaker: &CircuitBreaker, calls: &Calls) {
    for _ in 0..breaker.failure_threshold() {
        let res = breaker.execute(|| calls.fail()).await;
        assert!(res.is_err());
    }
}
