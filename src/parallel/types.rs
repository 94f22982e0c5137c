//! Type definitions for parallel processing
//!
//! Contains the task and submission types, batches, outcomes and configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::Context;
use crate::error::SinkError;

/// Unit of work handed to the submission callback.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fire-and-forget "run this somewhere" callback.
pub type Submitter = Arc<dyn Fn(Task) + Send + Sync + 'static>;

/// Most workers one parallel sink or pool will run.
pub const MAX_WORKERS: usize = 1024;

/// Configuration for parallel processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub num_workers: usize,
    pub batch_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            batch_size: 1000,
        }
    }
}

impl ParallelConfig {
    pub fn new(num_workers: usize, batch_size: usize) -> Self {
        Self {
            num_workers,
            batch_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(SinkError::InvalidConfig("parallelism must be at least 1".into()).into());
        }
        if self.num_workers > MAX_WORKERS {
            return Err(SinkError::InvalidConfig(format!(
                "parallelism {} exceeds the limit of {}",
                self.num_workers, MAX_WORKERS
            ))
            .into());
        }
        if self.batch_size == 0 {
            return Err(SinkError::InvalidConfig("batch size must be at least 1".into()).into());
        }
        Ok(())
    }
}

/// A batch of records bound for one worker
#[derive(Debug)]
pub(crate) struct WorkBatch<T> {
    pub id: u64,
    pub records: Vec<T>,
    pub ctx: Context,
}

/// Result of processing a batch
#[derive(Debug)]
pub(crate) struct BatchOutcome {
    pub batch_id: u64,
    pub worker: usize,
    pub result: Result<()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ParallelConfig::default();
        assert!(config.num_workers >= 1);
        assert_eq!(config.batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(ParallelConfig::new(0, 10).validate().is_err());
        assert!(ParallelConfig::new(2, 0).validate().is_err());
        assert!(ParallelConfig::new(MAX_WORKERS + 1, 1).validate().is_err());
        assert!(ParallelConfig::new(1, 1).validate().is_ok());
        assert!(ParallelConfig::new(MAX_WORKERS, usize::MAX).validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ParallelConfig = serde_json::from_str(r#"{"batch_size": 64}"#).unwrap();
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.num_workers, num_cpus::get());
    }
}
