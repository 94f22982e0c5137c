use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::Path;

use crate::error::SinkError;
use crate::parallel::{ParallelConfig, MAX_QUEUE_BOUND, MAX_WORKERS};

/// Resolved configuration for one run of the prime pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub input: InputConfig,
    pub performance: PerformanceConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfig {
    /// Records fed are `start..limit`.
    pub start: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceConfig {
    pub sequential: bool,
    /// 0 means one worker per CPU.
    pub threads: usize,
    pub batch_size: usize,
    pub chunk_size: usize,
    pub tail_chunk_size: usize,
    /// Upper bound on tasks waiting in the pool queue.
    pub queue_bound: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub print: bool,
    pub stats: bool,
    pub stats_format: StatsFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    Table,
    Json,
}

/// Values read from a JSON config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub start: Option<u64>,
    pub limit: Option<u64>,
    pub sequential: Option<bool>,
    pub threads: Option<usize>,
    pub batch_size: Option<usize>,
    pub chunk_size: Option<usize>,
    pub tail_chunk_size: Option<usize>,
    pub queue_bound: Option<usize>,
    pub print: Option<bool>,
    pub stats: Option<bool>,
    pub stats_format: Option<StatsFormat>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: InputConfig {
                start: 2,
                limit: 1_000_000,
            },
            performance: PerformanceConfig {
                sequential: false,
                threads: 0,
                batch_size: 16,
                chunk_size: 64,
                tail_chunk_size: 256,
                queue_bound: None,
            },
            output: OutputConfig {
                print: false,
                stats: false,
                stats_format: StatsFormat::Table,
            },
        }
    }
}

impl RunConfig {
    /// Layer file values over the current ones.
    pub fn merge_file(&mut self, file: FileConfig) {
        let FileConfig {
            start,
            limit,
            sequential,
            threads,
            batch_size,
            chunk_size,
            tail_chunk_size,
            queue_bound,
            print,
            stats,
            stats_format,
        } = file;

        if let Some(v) = start {
            self.input.start = v;
        }
        if let Some(v) = limit {
            self.input.limit = v;
        }
        if let Some(v) = sequential {
            self.performance.sequential = v;
        }
        if let Some(v) = threads {
            self.performance.threads = v;
        }
        if let Some(v) = batch_size {
            self.performance.batch_size = v;
        }
        if let Some(v) = chunk_size {
            self.performance.chunk_size = v;
        }
        if let Some(v) = tail_chunk_size {
            self.performance.tail_chunk_size = v;
        }
        if queue_bound.is_some() {
            self.performance.queue_bound = queue_bound;
        }
        if let Some(v) = print {
            self.output.print = v;
        }
        if let Some(v) = stats {
            self.output.stats = v;
        }
        if let Some(v) = stats_format {
            self.output.stats_format = v;
        }
    }

    /// Get effective thread count with defaults
    pub fn effective_threads(&self) -> usize {
        if self.performance.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.performance.threads
        }
    }

    /// Parallel stage settings, or `None` for a sequential run.
    pub fn parallel_config(&self) -> Option<ParallelConfig> {
        if self.performance.sequential {
            None
        } else {
            Some(ParallelConfig::new(
                self.effective_threads(),
                self.performance.batch_size,
            ))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.start > self.input.limit {
            return Err(SinkError::InvalidConfig(format!(
                "start {} is beyond limit {}",
                self.input.start, self.input.limit
            ))
            .into());
        }
        for (name, value) in [
            ("batch size", self.performance.batch_size),
            ("chunk size", self.performance.chunk_size),
            ("tail chunk size", self.performance.tail_chunk_size),
        ] {
            if value == 0 {
                return Err(SinkError::InvalidConfig(format!("{} must be at least 1", name)).into());
            }
        }
        if self.performance.threads > MAX_WORKERS {
            return Err(SinkError::InvalidConfig(format!(
                "threads must be at most {}",
                MAX_WORKERS
            ))
            .into());
        }
        match self.performance.queue_bound {
            Some(0) => {
                return Err(
                    SinkError::InvalidConfig("queue bound must be at least 1".into()).into(),
                )
            }
            Some(bound) if bound > MAX_QUEUE_BOUND => {
                return Err(SinkError::InvalidConfig(format!(
                    "queue bound must be at most {}",
                    MAX_QUEUE_BOUND
                ))
                .into())
            }
            _ => {}
        }
        Ok(())
    }
}
