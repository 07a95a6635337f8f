//! circuit-guard demo
//!
//! Drives a simulated flaky dependency through a circuit breaker and logs
//! what the breaker does with each call.
//!
//! ```text
//!  CLI flags ──┐
//!              ▼
//!  config.toml → AppConfig → BreakerRegistry ──▶ CircuitBreaker
//!                                                   │ execute()
//!                                                   ▼
//!                                            FlakyDependency
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use circuit_guard::config::{self, AppConfig, ConfigError};
use circuit_guard::observability::{logging, metrics};
use circuit_guard::simulation::FlakyDependency;
use circuit_guard::{BreakerError, BreakerRegistry, CircuitBreaker};

#[derive(Parser, Debug)]
#[command(name = "circuit-guard")]
#[command(about = "Run calls against a simulated dependency through a circuit breaker", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Breaker to call through.
    #[arg(short, long)]
    target: Option<String>,

    /// Number of calls to issue.
    #[arg(short = 'n', long)]
    calls: Option<u32>,

    /// Probability (0.0-1.0) that the simulated dependency fails.
    #[arg(short, long)]
    failure_rate: Option<f64>,

    /// Pause between calls in milliseconds.
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Simulated dependency latency in milliseconds.
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Cli {
    fn resolve(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => AppConfig::default(),
        };

        if let Some(target) = &self.target {
            config.demo.target = target.clone();
        }
        if let Some(calls) = self.calls {
            config.demo.calls = calls;
        }
        if let Some(rate) = self.failure_rate {
            config.demo.failure_rate = rate;
        }
        if let Some(interval) = self.interval_ms {
            config.demo.interval_ms = interval;
        }
        if let Some(latency) = self.latency_ms {
            config.demo.latency_ms = latency;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }

        // Overrides can invalidate a file that passed validation on load.
        config::validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    logging::init_logging(&config.observability)?;

    tracing::info!("circuit-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        breakers = config.breakers.len(),
        target = %config.demo.target,
        calls = config.demo.calls,
        failure_rate = config.demo.failure_rate,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let registry = BreakerRegistry::from_configs(&config.breakers)?;
    let breaker = registry
        .get(&config.demo.target)
        .ok_or_else(|| format!("unknown breaker `{}`", config.demo.target))?;
    let dependency = FlakyDependency::from_config(&config.demo);

    tokio::select! {
        _ = run_demo(&breaker, &dependency, &config) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping call loop");
        }
    }

    for snap in registry.snapshots().await {
        tracing::info!(
            breaker = %snap.name,
            state = %snap.state,
            consecutive_failures = snap.consecutive_failures,
            in_state_ms = snap.time_in_state().as_millis() as u64,
            has_succeeded = snap.last_successful_invoke.is_some(),
            "Final breaker state"
        );
    }
    tracing::info!(invocations = dependency.invocations(), "Dependency invocations");

    Ok(())
}

async fn run_demo(breaker: &CircuitBreaker, dependency: &FlakyDependency, config: &AppConfig) {
    let interval = Duration::from_millis(config.demo.interval_ms);

    for call in 1..=config.demo.calls {
        match breaker.execute(|| dependency.call()).await {
            Ok(()) => tracing::info!(call, "Call succeeded"),
            Err(BreakerError::Open) => tracing::warn!(call, "Call rejected: circuit breaker is open"),
            Err(e) => tracing::warn!(call, error = %e, "Call failed"),
        }

        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
}
