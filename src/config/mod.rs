//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → BreakerRegistry built from `breakers`
//! ```
//!
//! # Design Decisions
//! - Breaker parameters are immutable once a breaker is built; no hot reload
//! - Sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppConfig, BreakerConfig, DemoConfig, ObservabilityConfig};
pub use validation::{validate_breaker, validate_config, ValidationError};
