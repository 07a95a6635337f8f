//! Configuration validation.
//!
//! Serde handles the syntax; this module checks value ranges and
//! cross-references. Validation is a pure function that reports every
//! problem it finds, not just the first one.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AppConfig, BreakerConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("breaker name must not be empty")]
    EmptyBreakerName,

    #[error("breaker `{0}`: failure_threshold must be positive")]
    ZeroFailureThreshold(String),

    #[error("breaker `{0}`: recovery_time_ms must be positive")]
    ZeroRecoveryTime(String),

    #[error("duplicate breaker name `{0}`")]
    DuplicateBreaker(String),

    #[error("unknown log level `{0}`")]
    InvalidLogLevel(String),

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),

    #[error("demo failure_rate must be within 0.0..=1.0, got {0}")]
    InvalidFailureRate(String),

    #[error("demo target `{0}` does not name a configured breaker")]
    UnknownDemoTarget(String),
}

/// Validate the parameters of one breaker.
pub fn validate_breaker(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_breaker(config, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_breaker(config: &BreakerConfig, errors: &mut Vec<ValidationError>) {
    if config.name.trim().is_empty() {
        errors.push(ValidationError::EmptyBreakerName);
    }
    if config.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold(config.name.clone()));
    }
    if config.recovery_time_ms == 0 {
        errors.push(ValidationError::ZeroRecoveryTime(config.name.clone()));
    }
}

/// Validate a whole configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for breaker in &config.breakers {
        check_breaker(breaker, &mut errors);
        if !seen.insert(breaker.name.as_str()) {
            errors.push(ValidationError::DuplicateBreaker(breaker.name.clone()));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let rate = config.demo.failure_rate;
    if !(0.0..=1.0).contains(&rate) {
        errors.push(ValidationError::InvalidFailureRate(rate.to_string()));
    }

    if config.breaker(&config.demo.target).is_none() {
        errors.push(ValidationError::UnknownDemoTarget(config.demo.target.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
