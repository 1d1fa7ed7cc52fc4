//! Benchmark driver: serial and parallel phases over the external server.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::error::Result;
use crate::parse::{parse_eval_rate, MetricError};
use crate::report::Reporter;

/// Which benchmark phase a report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Serial,
    Parallel,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Serial => "serial",
            Phase::Parallel => "parallel",
        }
    }
}

/// Why a single run produced no metric
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    #[error("failed to start server: {0}")]
    Spawn(String),

    #[error("server exited with {status}: {detail}")]
    Failed { status: i32, detail: String },

    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// Outcome of one invocation
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Launch index within the phase, zero-based
    pub index: usize,
    /// Wall-clock duration of the invocation
    pub duration: Duration,
    /// Extracted tokens-per-second figure, or the explicit per-run failure
    pub eval_rate: std::result::Result<f64, RunError>,
}

/// All records of one phase, in launch order, plus total elapsed time
#[derive(Debug)]
pub struct PhaseReport {
    pub phase: Phase,
    pub records: Vec<RunRecord>,
    pub elapsed: Duration,
}

/// Drives the serial and parallel phases over a validated configuration
pub struct BenchRunner {
    config: BenchConfig,
}

impl BenchRunner {
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Discarded invocations that bring the model into memory before
    /// measurement starts.
    pub fn warmup(&self, reporter: &Reporter) {
        for i in 0..self.config.warmup_runs {
            reporter.warmup_line(i + 1, self.config.warmup_runs);
            let record = execute_run(&self.config, i);
            debug!(run = i + 1, outcome = ?record.eval_rate, "warmup run finished");
        }
    }

    /// Invoke the server `serial_runs` times, one after another.
    ///
    /// Each run blocks until the previous one completes; its result line is
    /// reported as soon as it is known.
    pub fn run_serial(&self, reporter: &Reporter) -> PhaseReport {
        let n = self.config.serial_runs;
        info!(runs = n, model = %self.config.model, "serial phase starting");
        reporter.phase_start(Phase::Serial, n);

        let started = Instant::now();
        let mut records = Vec::with_capacity(n);
        for index in 0..n {
            let record = execute_run(&self.config, index);
            reporter.run_line(&record);
            records.push(record);
        }

        PhaseReport {
            phase: Phase::Serial,
            records,
            elapsed: started.elapsed(),
        }
    }

    /// Launch `parallel_runs` invocations at once and wait for all of them.
    ///
    /// Every worker thread holds at the barrier until the full set is
    /// spawned, so the requests hit the server together. Records are slotted
    /// by launch index; joining the handles in spawn order keeps reporting
    /// in launch order, not completion order. There is no timeout: a hung
    /// invocation blocks the phase.
    pub fn run_parallel(&self, reporter: &Reporter) -> PhaseReport {
        let n = self.config.parallel_runs;
        info!(runs = n, model = %self.config.model, "parallel phase starting");
        reporter.phase_start(Phase::Parallel, n);

        let barrier = Arc::new(Barrier::new(n));
        let started = Instant::now();

        let handles: Vec<thread::JoinHandle<RunRecord>> = (0..n)
            .map(|index| {
                let config = self.config.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    execute_run(&config, index)
                })
            })
            .collect();

        let records: Vec<RunRecord> = handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                handle.join().unwrap_or_else(|_| RunRecord {
                    index,
                    duration: Duration::ZERO,
                    eval_rate: Err(RunError::Spawn("worker thread panicked".to_string())),
                })
            })
            .collect();

        for record in &records {
            reporter.run_line(record);
        }

        PhaseReport {
            phase: Phase::Parallel,
            records,
            elapsed: started.elapsed(),
        }
    }
}

/// Run one invocation and capture its outcome.
///
/// A failure here never aborts the phase; it becomes the record's error.
fn execute_run(config: &BenchConfig, index: usize) -> RunRecord {
    let started = Instant::now();
    let outcome = config
        .server
        .run_prompt(&config.model, &config.prompt, &config.limits);
    let duration = started.elapsed();

    let eval_rate = match outcome {
        Err(e) => Err(RunError::Spawn(e.to_string())),
        Ok(output) => {
            if output.status.success() {
                // The throughput figures land on the diagnostic stream, but
                // some builds put them on stdout; scan both.
                let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
                text.push('\n');
                text.push_str(&String::from_utf8_lossy(&output.stdout));
                parse_eval_rate(&text).map_err(RunError::from)
            } else {
                Err(RunError::Failed {
                    status: output.status.code().unwrap_or(-1),
                    detail: stderr_excerpt(&output.stderr),
                })
            }
        }
    };

    RunRecord {
        index,
        duration,
        eval_rate,
    }
}

/// Last non-empty stderr line, for one-line failure reporting
fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("(no output)")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerLimits, DEFAULT_PROMPT};
    use crate::report::OutputFormat;
    use crate::server::ServerCommand;

    #[cfg(unix)]
    fn stub_config(dir: &std::path::Path, body: &str, serial: usize, parallel: usize) -> BenchConfig {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("stub-server");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        BenchConfig {
            model: "stub:latest".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            serial_runs: serial,
            parallel_runs: parallel,
            warmup_runs: 0,
            format: OutputFormat::Plain,
            server: ServerCommand::new(path.to_string_lossy().to_string()),
            limits: ServerLimits::default(),
        }
    }

    #[cfg(unix)]
    fn quiet_reporter() -> Reporter {
        Reporter::new(OutputFormat::Plain, true)
    }

    #[test]
    fn test_rejects_zero_run_config() {
        let config = BenchConfig {
            model: "m".to_string(),
            prompt: String::new(),
            serial_runs: 0,
            parallel_runs: 1,
            warmup_runs: 0,
            format: OutputFormat::Plain,
            server: ServerCommand::default(),
            limits: ServerLimits::default(),
        };
        assert!(BenchRunner::new(config).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_serial_records_constant_rate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = stub_config(
            dir.path(),
            "echo 'eval rate: 42.50 tokens/s' >&2",
            3,
            1,
        );
        let runner = BenchRunner::new(config).unwrap();

        let report = runner.run_serial(&quiet_reporter());
        assert_eq!(report.phase, Phase::Serial);
        assert_eq!(report.records.len(), 3);
        for (i, record) in report.records.iter().enumerate() {
            assert_eq!(record.index, i);
            assert_eq!(*record.eval_rate.as_ref().unwrap(), 42.5);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_parallel_joins_all_runs_in_launch_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = stub_config(
            dir.path(),
            "echo 'eval rate: 13.25 tokens/s' >&2",
            1,
            4,
        );
        let runner = BenchRunner::new(config).unwrap();

        let report = runner.run_parallel(&quiet_reporter());
        assert_eq!(report.phase, Phase::Parallel);
        assert_eq!(report.records.len(), 4);
        let indexes: Vec<usize> = report.records.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
        assert!(report
            .records
            .iter()
            .all(|r| *r.eval_rate.as_ref().unwrap() == 13.25));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_metric_is_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = stub_config(dir.path(), "echo 'model loaded'", 2, 1);
        let runner = BenchRunner::new(config).unwrap();

        let report = runner.run_serial(&quiet_reporter());
        assert_eq!(report.records.len(), 2);
        for record in &report.records {
            assert!(matches!(
                record.eval_rate,
                Err(RunError::Metric(MetricError::NotFound))
            ));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_invocation_is_recorded_with_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = stub_config(dir.path(), "echo 'out of memory' >&2; exit 7", 1, 1);
        let runner = BenchRunner::new(config).unwrap();

        let report = runner.run_serial(&quiet_reporter());
        match &report.records[0].eval_rate {
            Err(RunError::Failed { status, detail }) => {
                assert_eq!(*status, 7);
                assert_eq!(detail, "out of memory");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_elapsed_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let config = stub_config(
            dir.path(),
            "sleep 0.05; echo 'eval rate: 1.00 tokens/s' >&2",
            2,
            1,
        );
        let runner = BenchRunner::new(config).unwrap();

        let report = runner.run_serial(&quiet_reporter());
        // Two serial 50ms runs cannot finish in less than 100ms.
        assert!(report.elapsed >= Duration::from_millis(100));
        assert!(report
            .records
            .iter()
            .all(|r| r.duration >= Duration::from_millis(50)));
    }

    #[test]
    fn test_stderr_excerpt_takes_last_line() {
        assert_eq!(stderr_excerpt(b"a\nb\nlast error\n\n"), "last error");
        assert_eq!(stderr_excerpt(b""), "(no output)");
    }
}
