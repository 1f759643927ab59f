use std::thread;
use std::time::Duration;

use crate::error::IngestError;

/// Floor for the derived worker count
pub const MIN_DEFAULT_WORKERS: usize = 2;

/// How long to wait for the pool after every file has been queued
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for one ingest run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    /// Fixed worker pool size
    pub workers: usize,

    /// Per-file read budget; `None` means unbounded
    pub file_timeout: Option<Duration>,

    /// Upper bound on waiting for the whole pool to drain
    pub shutdown_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            file_timeout: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl IngestConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_file_timeout(mut self, timeout: Duration) -> Self {
        self.file_timeout = Some(timeout);
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.workers == 0 {
            return Err(IngestError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.file_timeout.is_some_and(|t| t.is_zero()) {
            return Err(IngestError::InvalidConfig(
                "file_timeout must be greater than zero".to_string(),
            ));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(IngestError::InvalidConfig(
                "shutdown_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Host parallelism, never below [`MIN_DEFAULT_WORKERS`]
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(MIN_DEFAULT_WORKERS)
}
