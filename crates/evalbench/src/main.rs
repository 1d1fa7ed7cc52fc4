//! evalbench - throughput benchmark for a local LLM inference server
//!
//! Runs a fixed prompt against the server binary serially and in parallel,
//! scrapes the reported eval rate from each invocation's verbose output,
//! and reports per-run and averaged tokens/second per phase.

mod cli;
mod prompt;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use libevalbench_core::{
    config::{DEFAULT_PROMPT, DEFAULT_RUNS},
    load_file_config, server, BenchConfig, BenchError, BenchRunner, PhaseStats, Reporter,
    Result, ServerCommand, ServerLimits,
};

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        let suggestions = e.suggestions();
        if !suggestions.is_empty() {
            eprintln!();
            eprintln!("Suggestions:");
            for suggestion in suggestions {
                eprintln!("  - {}", suggestion);
            }
        }
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<()> {
    let file = load_file_config(&cli.config)?.unwrap_or_default();

    let server = ServerCommand::new(
        cli.server_bin
            .clone()
            .or_else(|| file.server_bin.clone())
            .unwrap_or_else(|| server::DEFAULT_SERVER_BIN.to_string()),
    );

    // The binary is checked once, up front, before anything is asked of the
    // user.
    let resolved = server.resolve()?;
    info!(binary = %resolved.display(), "server binary resolved");

    let mut limits = ServerLimits::default();
    file.apply_limits(&mut limits);
    if let Some(v) = cli.max_loaded {
        limits.max_loaded_models = v;
    }
    if let Some(v) = cli.num_parallel {
        limits.num_parallel = v;
    }
    if let Some(v) = cli.context_size {
        limits.context_length = v;
    }
    if let Some(v) = cli.queue_size {
        limits.max_queue = v;
    }

    let model = match cli.model.clone().or_else(|| file.model.clone()) {
        Some(model) => model,
        None if cli.defaults => server
            .list_models()?
            .into_iter()
            .next()
            .ok_or_else(|| {
                BenchError::InvalidArgs(
                    "--defaults needs at least one locally available model".to_string(),
                )
            })?,
        None => prompt::model(&server)?,
    };

    let serial_runs = match cli.runs.or(file.serial_runs) {
        Some(n) => n,
        None if cli.defaults => DEFAULT_RUNS,
        None => prompt::count("Serial runs", DEFAULT_RUNS)?,
    };
    let parallel_runs = match cli.parallel.or(file.parallel_runs) {
        Some(n) => n,
        None if cli.defaults => DEFAULT_RUNS,
        None => prompt::count("Parallel runs", DEFAULT_RUNS)?,
    };

    let config = BenchConfig {
        model,
        prompt: cli
            .prompt
            .clone()
            .or_else(|| file.prompt.clone())
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        serial_runs,
        parallel_runs,
        warmup_runs: cli.warmup.or(file.warmup_runs).unwrap_or(0),
        format: cli.output_format(),
        server,
        limits,
    };

    let runner = BenchRunner::new(config)?;
    let reporter = Reporter::new(runner.config().format, cli.quiet);

    server::persist_limits(&runner.config().limits);

    reporter.header(runner.config());
    runner.warmup(&reporter);

    let serial = runner.run_serial(&reporter);
    let serial_stats = PhaseStats::from_records(&serial.records);
    reporter.phase_summary(&serial, &serial_stats);
    if serial_stats.succeeded == 0 {
        return Err(BenchError::NoMetrics(serial.phase.as_str()));
    }

    let parallel = runner.run_parallel(&reporter);
    let parallel_stats = PhaseStats::from_records(&parallel.records);
    reporter.phase_summary(&parallel, &parallel_stats);
    if parallel_stats.succeeded == 0 {
        return Err(BenchError::NoMetrics(parallel.phase.as_str()));
    }

    Ok(())
}
