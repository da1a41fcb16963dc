//! Configuration for batch execution

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding [`ParallelConfig::max_workers`]
pub const ENV_MAX_WORKERS: &str = "PARALLEL_MAX_WORKERS";
/// Environment variable overriding [`ParallelConfig::worker_keep_alive_ms`]
pub const ENV_WORKER_KEEP_ALIVE_MS: &str = "PARALLEL_WORKER_KEEP_ALIVE_MS";

/// Configuration for parallel execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Maximum number of worker threads for blocking jobs (default: 512)
    ///
    /// Blocking jobs beyond this bound wait for a free worker. A bound lower
    /// than the number of blocking jobs that wait on each other deadlocks the
    /// batch.
    pub max_workers: usize,
    /// Idle time before a worker thread exits, in milliseconds (default: 10s)
    pub worker_keep_alive_ms: u64,
    /// Name given to worker threads
    pub worker_thread_name: String,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_workers: 512,
            worker_keep_alive_ms: 10_000,
            worker_thread_name: "parallel-worker".to_string(),
        }
    }
}

impl ParallelConfig {
    /// Defaults overlaid with `PARALLEL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_WORKERS) {
            config.max_workers = raw.trim().parse::<usize>().map_err(|e| {
                Error::config(format!("{} must be an integer, got '{}': {}", ENV_MAX_WORKERS, raw, e))
            })?;
        }

        if let Some(raw) = lookup(ENV_WORKER_KEEP_ALIVE_MS) {
            config.worker_keep_alive_ms = raw.trim().parse::<u64>().map_err(|e| {
                Error::config(format!(
                    "{} must be an integer, got '{}': {}",
                    ENV_WORKER_KEEP_ALIVE_MS, raw, e
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::config("max_workers must be at least 1"));
        }
        if self.worker_thread_name.is_empty() {
            return Err(Error::config("worker_thread_name must not be empty"));
        }
        Ok(())
    }

    /// Worker idle timeout as a [`Duration`]
    pub fn worker_keep_alive(&self) -> Duration {
        Duration::from_millis(self.worker_keep_alive_ms)
    }
}
