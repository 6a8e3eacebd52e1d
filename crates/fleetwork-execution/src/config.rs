//! Configuration for the execution controller

use crate::retry::RetryPolicy;
use fleetwork_types::EXECUTION_FINALIZER;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Largest accepted growth factor between conflict retries
pub const MAX_RETRY_FACTOR: f64 = 10.0;

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid execution config: {0}")]
pub struct ConfigError(pub String);

/// Execution controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of Works reconciled in parallel
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Upper bound for a single reconcile
    #[serde(default = "default_reconcile_timeout")]
    pub reconcile_timeout_secs: u64,

    /// Delay before a failed Work is delivered again
    #[serde(default = "default_requeue_delay")]
    pub requeue_delay_ms: u64,

    /// Delay before retrying a Work whose failure needs an outside change,
    /// such as a malformed manifest or namespace
    #[serde(default = "default_stuck_requeue_delay")]
    pub stuck_requeue_delay_ms: u64,

    /// Finalizer token guarding teardown
    #[serde(default = "default_finalizer")]
    pub finalizer: String,

    /// Status update conflict retries
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            reconcile_timeout_secs: default_reconcile_timeout(),
            requeue_delay_ms: default_requeue_delay(),
            stuck_requeue_delay_ms: default_stuck_requeue_delay(),
            finalizer: default_finalizer(),
            retry: RetryConfig::default(),
        }
    }
}

/// Conflict retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_steps")]
    pub steps: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_factor")]
    pub factor: f64,

    #[serde(default = "default_jitter")]
    pub jitter: f64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            steps: default_retry_steps(),
            initial_delay_ms: default_initial_delay(),
            factor: default_factor(),
            jitter: default_jitter(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            steps: self.steps,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            factor: self.factor,
            jitter: self.jitter,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl ExecutionConfig {
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    pub fn requeue_delay(&self) -> Duration {
        Duration::from_millis(self.requeue_delay_ms)
    }

    pub fn stuck_requeue_delay(&self) -> Duration {
        Duration::from_millis(self.stuck_requeue_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError("workers must be at least 1".into()));
        }
        if self.reconcile_timeout_secs == 0 {
            return Err(ConfigError("reconcile_timeout_secs must be positive".into()));
        }
        if self.finalizer.trim().is_empty() {
            return Err(ConfigError("finalizer must not be empty".into()));
        }
        if self.retry.steps == 0 {
            return Err(ConfigError("retry.steps must be at least 1".into()));
        }
        if !(1.0..=MAX_RETRY_FACTOR).contains(&self.retry.factor) {
            return Err(ConfigError(format!(
                "retry.factor must be within [1, {}], got {}",
                MAX_RETRY_FACTOR, self.retry.factor
            )));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError(format!(
                "retry.jitter must be within [0, 1], got {}",
                self.retry.jitter
            )));
        }
        Ok(())
    }
}

// Default value helpers
fn default_workers() -> usize {
    4
}

fn default_reconcile_timeout() -> u64 {
    30
}

fn default_requeue_delay() -> u64 {
    1000
}

fn default_stuck_requeue_delay() -> u64 {
    30_000
}

fn default_finalizer() -> String {
    EXECUTION_FINALIZER.to_string()
}

fn default_retry_steps() -> u32 {
    5
}

fn default_initial_delay() -> u64 {
    10
}

fn default_factor() -> f64 {
    1.0
}

fn default_jitter() -> f64 {
    0.1
}

fn default_max_delay() -> u64 {
    1000
}
