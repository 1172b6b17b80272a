//! Worker pool sizing for local parallel execution.

use gc_types::{config_error, internal_error, GcResult};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the worker count.
pub const WORKERS_ENV_VAR: &str = "GRIDCAST_WORKERS";

/// Configuration of the local worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Maximum number of tasks evaluated concurrently.
    pub num_workers: usize,

    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            thread_name: "gridcast-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    /// Defaults, overridden by `GRIDCAST_WORKERS` when set.
    pub fn from_env() -> GcResult<Self> {
        Self::from_env_value(std::env::var(WORKERS_ENV_VAR).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> GcResult<Self> {
        let config = Self::default();
        match value.map(str::trim) {
            None | Some("") => Ok(config),
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Ok(config.with_workers(n)),
                _ => Err(config_error!(
                    "{} must be a positive integer, got '{}'",
                    WORKERS_ENV_VAR,
                    raw
                )),
            },
        }
    }

    /// Workers actually needed for `tasks` tasks.
    pub fn workers_for(&self, tasks: usize) -> usize {
        self.num_workers.min(tasks).max(1)
    }

    /// Build a rayon pool sized for `tasks` tasks.
    pub fn build_pool(&self, tasks: usize) -> GcResult<ThreadPool> {
        let prefix = self.thread_name.clone();
        ThreadPoolBuilder::new()
            .num_threads(self.workers_for(tasks))
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map_err(|e| internal_error!("Failed to build worker pool: {}", e))
    }
}
