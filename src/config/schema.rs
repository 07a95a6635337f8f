//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the breaker demo
//! harness. All types derive Serde traits for deserialization from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// One entry per protected dependency.
    pub breakers: Vec<BreakerConfig>,

    /// Illustrative call loop driven by the binary.
    pub demo: DemoConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig::default(),
            breakers: vec![BreakerConfig::default()],
            demo: DemoConfig::default(),
        }
    }
}

impl AppConfig {
    /// Look up a breaker definition by name.
    pub fn breaker(&self, name: &str) -> Option<&BreakerConfig> {
        self.breakers.iter().find(|b| b.name == name)
    }
}

/// Circuit breaker parameters for a single dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BreakerConfig {
    /// Breaker identifier for logging/metrics.
    pub name: String,

    /// Consecutive failures that force the breaker open.
    pub failure_threshold: u32,

    /// Cool-down before a probe is attempted, in milliseconds. Also bounds
    /// the probe itself.
    pub recovery_time_ms: u64,
}

impl BreakerConfig {
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_time: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            recovery_time_ms: recovery_time.as_millis() as u64,
        }
    }

    pub fn recovery_time(&self) -> Duration {
        Duration::from_millis(self.recovery_time_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            failure_threshold: 3,
            recovery_time_ms: 5_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Settings for the demo call loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Name of the breaker the loop calls through.
    pub target: String,

    /// Number of calls to issue.
    pub calls: u32,

    /// Pause between calls in milliseconds.
    pub interval_ms: u64,

    /// Probability (0.0..=1.0) that the simulated dependency fails.
    pub failure_rate: f64,

    /// Simulated dependency latency in milliseconds.
    pub latency_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            target: "default".to_string(),
            calls: 10,
            interval_ms: 0,
            failure_rate: 0.0,
            latency_ms: 0,
        }
    }
}
