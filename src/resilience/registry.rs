//! Named breaker lookup.
//!
//! Callers that protect several dependencies keep one breaker per
//! dependency here. The registry only hands out `Arc`s; each breaker still
//! owns its own state.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::{BreakerConfig, ConfigError};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::types::BreakerSnapshot;

/// Map of dependency name → breaker.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a breaker for every config entry. Later duplicates replace
    /// earlier ones; `validate_config` reports them beforehand.
    pub fn from_configs(configs: &[BreakerConfig]) -> Result<Self, ConfigError> {
        let registry = Self::new();
        for config in configs {
            let breaker = CircuitBreaker::from_config(config).map_err(ConfigError::Validation)?;
            registry.insert(breaker);
        }
        Ok(registry)
    }

    /// Register a breaker under its own name, returning any it replaced.
    pub fn insert(&self, breaker: CircuitBreaker) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .insert(breaker.name().to_string(), Arc::new(breaker))
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Get the breaker for `config.name`, creating it from `config` if absent.
    pub fn get_or_insert(&self, config: &BreakerConfig) -> Result<Arc<CircuitBreaker>, ConfigError> {
        if let Some(existing) = self.get(&config.name) {
            return Ok(existing);
        }
        let breaker = CircuitBreaker::from_config(config).map_err(ConfigError::Validation)?;
        let breaker = Arc::new(breaker);
        Ok(self
            .breakers
            .entry(config.name.clone())
            .or_insert(breaker)
            .value()
            .clone())
    }

    pub fn remove(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.remove(name).map(|(_, breaker)| breaker)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot every breaker, sorted by name.
    ///
    /// Waits on each breaker's lock in turn, so a breaker busy with a slow
    /// call delays the result.
    pub async fn snapshots(&self) -> Vec<BreakerSnapshot> {
        // Collect first: DashMap guards must not be held across an await.
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|e| e.value().clone()).collect();

        let mut snapshots = Vec::with_capacity(breakers.len());
        for breaker in breakers {
            snapshots.push(breaker.snapshot().await);
        }
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
