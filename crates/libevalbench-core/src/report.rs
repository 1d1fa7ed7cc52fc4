//! Rendering of benchmark results, plain text or markdown.

use chrono::Local;
use comfy_table::{presets::ASCII_MARKDOWN, Table};

use crate::config::BenchConfig;
use crate::runner::{Phase, PhaseReport, RunRecord};
use crate::stats::PhaseStats;

/// Report rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Plain,
    Markdown,
}

impl Phase {
    fn title(&self) -> &'static str {
        match self {
            Phase::Serial => "Serial",
            Phase::Parallel => "Parallel",
        }
    }
}

/// Writes the benchmark output to stdout.
///
/// Plain mode streams one line per run as results become known; markdown
/// mode collects each phase into a single two-column table.
pub struct Reporter {
    format: OutputFormat,
    quiet: bool,
}

impl Reporter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Opening block naming the configuration under test
    pub fn header(&self, config: &BenchConfig) {
        if self.quiet {
            return;
        }
        let started = Local::now().format("%Y-%m-%d %H:%M:%S");
        match self.format {
            OutputFormat::Plain => {
                println!("evalbench - inference throughput benchmark");
                println!();
                println!("Started:        {}", started);
                println!("Server:         {}", config.server.command());
                println!("Model:          {}", config.model);
                println!("Serial runs:    {}", config.serial_runs);
                println!("Parallel runs:  {}", config.parallel_runs);
                println!(
                    "Limits:         {} loaded / {} parallel / ctx {} / queue {}",
                    config.limits.max_loaded_models,
                    config.limits.num_parallel,
                    config.limits.context_length,
                    config.limits.max_queue
                );
            }
            OutputFormat::Markdown => {
                println!("# evalbench: {}", config.model);
                println!();
                println!(
                    "Started {} against `{}` ({} serial, {} parallel).",
                    started,
                    config.server.command(),
                    config.serial_runs,
                    config.parallel_runs
                );
            }
        }
    }

    pub fn warmup_line(&self, current: usize, total: usize) {
        if self.quiet {
            return;
        }
        if self.format == OutputFormat::Plain {
            println!("warmup {}/{}...", current, total);
        }
    }

    pub fn phase_start(&self, phase: Phase, runs: usize) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Plain => {
                println!();
                println!("=== {} phase: {} runs ===", phase.title(), runs);
            }
            OutputFormat::Markdown => {
                println!();
                println!("## {} phase", phase.title());
                println!();
            }
        }
    }

    /// One result line, emitted in launch order.
    ///
    /// Markdown mode defers to the phase table so each result still appears
    /// exactly once.
    pub fn run_line(&self, record: &RunRecord) {
        if self.quiet || self.format != OutputFormat::Plain {
            return;
        }
        match &record.eval_rate {
            Ok(rate) => println!(
                "run {:>2}: {:.2} tokens/s  ({:.2}s)",
                record.index + 1,
                rate,
                record.duration.as_secs_f64()
            ),
            Err(e) => println!("run {:>2}: error: {}", record.index + 1, e),
        }
    }

    /// Closing block for one phase: the averaged throughput and the elapsed
    /// wall time.
    pub fn phase_summary(&self, report: &PhaseReport, stats: &PhaseStats) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Plain => {
                println!();
                if stats.failed > 0 {
                    println!("Failed runs:    {}/{}", stats.failed, stats.runs);
                }
                if let (Some(min), Some(max)) = (stats.min, stats.max) {
                    println!("Min / Max:      {:.2} / {:.2} tokens/s", min, max);
                }
                println!(
                    "Avg duration:   {:.2}s",
                    stats.mean_duration.as_secs_f64()
                );
                match stats.mean {
                    Some(mean) => println!("Average:        {:.2} tokens/s", mean),
                    None => println!("Average:        n/a (no successful runs)"),
                }
                println!("Elapsed:        {:.2}s", report.elapsed.as_secs_f64());
            }
            OutputFormat::Markdown => {
                println!("{}", markdown_table(&report.records, stats));
                println!();
                println!("Elapsed: {:.2}s", report.elapsed.as_secs_f64());
            }
        }
    }
}

/// Two-column markdown table for one phase, one row per run, closed by the
/// average row
fn markdown_table(records: &[RunRecord], stats: &PhaseStats) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);
    table.set_header(vec!["Run", "Eval rate (tokens/s)"]);

    for record in records {
        let value = match &record.eval_rate {
            Ok(rate) => format!("{:.2}", rate),
            Err(e) => format!("error: {}", e),
        };
        table.add_row(vec![(record.index + 1).to_string(), value]);
    }

    let average = match stats.mean {
        Some(mean) => format!("{:.2}", mean),
        None => "n/a".to_string(),
    };
    table.add_row(vec!["Average".to_string(), average]);

    table.to_string()
}
