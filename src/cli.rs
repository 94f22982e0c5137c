// CLI structure - contains all command-line arguments and options

use clap::Parser;
use std::path::PathBuf;

use sinkline::config::{RunConfig, StatsFormat};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum CliStatsFormat {
    Table,
    Json,
}

impl From<CliStatsFormat> for StatsFormat {
    fn from(format: CliStatsFormat) -> Self {
        match format {
            CliStatsFormat::Table => StatsFormat::Table,
            CliStatsFormat::Json => StatsFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sinkline")]
#[command(about = "Run the reference prime pipeline through composable sinks")]
#[command(
    long_about = "Run the reference prime pipeline through composable sinks\n\nThe pipeline is:\n  filter(is_prime) -> aggregate -> parallel fan-out -> decompose -> shared aggregate -> collector\n\nCOMMON EXAMPLES:\n  sinkline --limit 100000 --threads 8 --batch-size 4\n  sinkline --limit 100 --print --sequential\n  sinkline --config run.json --stats --stats-format json"
)]
#[command(version)]
pub struct Cli {
    /// First number fed into the pipeline
    #[arg(long, help_heading = "Input Options")]
    pub start: Option<u64>,

    /// Feed numbers below this limit
    #[arg(short = 'n', long, help_heading = "Input Options")]
    pub limit: Option<u64>,

    /// JSON config file; command-line flags take precedence over its values
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Skip the parallel stage
    #[arg(long, help_heading = "Performance Options")]
    pub sequential: bool,

    /// Number of workers (0 = one per CPU)
    #[arg(short = 't', long, help_heading = "Performance Options")]
    pub threads: Option<usize>,

    /// Chunks per batch handed to a worker
    #[arg(short = 'b', long, help_heading = "Performance Options")]
    pub batch_size: Option<usize>,

    /// Primes per chunk before the fan-out
    #[arg(long, help_heading = "Performance Options")]
    pub chunk_size: Option<usize>,

    /// Primes per batch in the shared tail
    #[arg(long, help_heading = "Performance Options")]
    pub tail_chunk_size: Option<usize>,

    /// Maximum tasks waiting in the worker pool queue
    #[arg(long, help_heading = "Performance Options")]
    pub queue_bound: Option<usize>,

    /// Print every prime found, one per line
    #[arg(short = 'p', long, help_heading = "Output Options")]
    pub print: bool,

    /// Print per-worker counters after the run
    #[arg(short = 's', long, help_heading = "Output Options")]
    pub stats: bool,

    /// Format for --stats output
    #[arg(long, value_enum, help_heading = "Output Options")]
    pub stats_format: Option<CliStatsFormat>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Layer command-line values over `config`.
    pub fn apply_to(&self, config: &mut RunConfig) {
        if let Some(start) = self.start {
            config.input.start = start;
        }
        if let Some(limit) = self.limit {
            config.input.limit = limit;
        }
        if self.sequential {
            config.performance.sequential = true;
        }
        if let Some(threads) = self.threads {
            config.performance.threads = threads;
        }
        if let Some(batch_size) = self.batch_size {
            config.performance.batch_size = batch_size;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.performance.chunk_size = chunk_size;
        }
        if let Some(tail_chunk_size) = self.tail_chunk_size {
            config.performance.tail_chunk_size = tail_chunk_size;
        }
        if self.queue_bound.is_some() {
            config.performance.queue_bound = self.queue_bound;
        }
        if self.print {
            config.output.print = true;
        }
        if self.stats {
            config.output.stats = true;
        }
        if let Some(format) = self.stats_format {
            config.output.stats_format = format.into();
        }
    }
}
