//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! CircuitBreaker produces:
//!     → tracing events (transitions, rejections, probe outcomes)
//!     → metrics.rs (call counters, transition counters, state gauge)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
