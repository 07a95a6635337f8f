//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → registry.rs (look up the dependency's breaker, optional)
//!     → circuit_breaker.rs (admit or reject, record the outcome)
//!     → timeouts.rs (bound the recovery probe)
//! ```
//!
//! # Design Decisions
//! - The breaker never retries; retry is the caller's business
//! - Breaker rejections are distinct from dependency errors
//! - No background tasks; nothing to shut down when a breaker is dropped

pub mod circuit_breaker;
pub mod registry;
pub mod timeouts;
pub mod types;

pub use circuit_breaker::CircuitBreaker;
pub use registry::BreakerRegistry;
pub use types::{BreakerError, BreakerSnapshot, State};
