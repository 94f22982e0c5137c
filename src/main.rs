use anyhow::Result;
use clap::Parser;
use std::io::{self, BufWriter, Write};
use std::process;
use tracing_subscriber::EnvFilter;

use sinkline::config::{FileConfig, RunConfig, StatsFormat};
use sinkline::pipeline::PrimePipelineBuilder;
use sinkline::{run_inline, Context, WorkerPool};

mod cli;

use cli::Cli;

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy)]
enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
}

impl ExitCode {
    fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

fn setup_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second initialization (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("sinkline: {:#}", err);
            ExitCode::InvalidUsage.exit()
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::Success.exit(),
        Err(err) => {
            eprintln!("sinkline: {:#}", err);
            ExitCode::GeneralError.exit()
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = RunConfig::default();
    if let Some(path) = &cli.config {
        config.merge_file(FileConfig::load(path)?);
    }
    cli.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

fn run(config: &RunConfig) -> Result<()> {
    let parallel = config.parallel_config();

    let pool = match &parallel {
        Some(parallel) => Some(WorkerPool::with_queue_bound(
            parallel.num_workers,
            config.performance.queue_bound,
        )?),
        None => None,
    };
    let submit = pool
        .as_ref()
        .map(WorkerPool::submitter)
        .unwrap_or_else(run_inline);

    let mut pipeline = PrimePipelineBuilder::new()
        .with_chunk_size(config.performance.chunk_size)
        .with_tail_chunk_size(config.performance.tail_chunk_size)
        .with_parallel(parallel)
        .build(submit)?;

    let ctx = Context::new();
    tracing::info!(
        start = config.input.start,
        limit = config.input.limit,
        workers = config.parallel_config().map_or(0, |p| p.num_workers),
        "running prime pipeline"
    );
    pipeline.run(config.input.start, config.input.limit, &ctx)?;
    let primes = pipeline.primes();
    tracing::info!(
        primes = primes.len(),
        elapsed_ms = ctx.elapsed().as_millis() as u64,
        "pipeline committed"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if config.output.print {
        for prime in &primes {
            writeln!(out, "{}", prime)?;
        }
    } else {
        writeln!(out, "{}", primes.len())?;
    }
    out.flush()?;

    if config.output.stats {
        if let Some(counters) = pipeline.work_counters() {
            match config.output.stats_format {
                StatsFormat::Table => eprintln!("{}", counters),
                StatsFormat::Json => eprintln!("{}", counters.to_json()?),
            }
        } else {
            eprintln!("sequential run: no worker counters");
        }
    }
    Ok(())
}
