//! Aggregation of per-run records into phase statistics.

use std::time::Duration;

use crate::runner::RunRecord;

/// Derived statistics for one phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseStats {
    /// Total runs in the phase
    pub runs: usize,
    /// Runs that yielded a metric
    pub succeeded: usize,
    /// Runs recorded with an explicit error
    pub failed: usize,
    /// Sum of successful eval rates, tokens/second
    pub sum: f64,
    /// Arithmetic mean over *successful* runs; `None` when none succeeded
    pub mean: Option<f64>,
    /// Slowest successful rate
    pub min: Option<f64>,
    /// Fastest successful rate
    pub max: Option<f64>,
    /// Mean wall-clock duration across all runs
    pub mean_duration: Duration,
}

impl PhaseStats {
    pub fn from_records(records: &[RunRecord]) -> Self {
        let rates: Vec<f64> = records
            .iter()
            .filter_map(|r| r.eval_rate.as_ref().ok())
            .copied()
            .collect();

        let succeeded = rates.len();
        let sum: f64 = rates.iter().sum();
        let mean = (succeeded > 0).then(|| sum / succeeded as f64);
        let min = rates.iter().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.min(v)))
        });
        let max = rates.iter().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        });

        let total_duration: Duration = records.iter().map(|r| r.duration).sum();
        let mean_duration = if records.is_empty() {
            Duration::ZERO
        } else {
            total_duration / records.len() as u32
        };

        Self {
            runs: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            sum,
            mean,
            min,
            max,
            mean_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::MetricError;
    use crate::runner::RunError;

    fn ok_record(index: usize, rate: f64) -> RunRecord {
        RunRecord {
            index,
            duration: Duration::from_millis(100),
            eval_rate: Ok(rate),
        }
    }

    fn failed_record(index: usize) -> RunRecord {
        RunRecord {
            index,
            duration: Duration::from_millis(100),
            eval_rate: Err(RunError::Metric(MetricError::NotFound)),
        }
    }

    #[test]
    fn test_mean_of_three_rates() {
        let records = vec![
            ok_record(0, 10.0),
            ok_record(1, 20.0),
            ok_record(2, 30.0),
        ];
        let stats = PhaseStats::from_records(&records);
        assert_eq!(stats.runs, 3);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.mean, Some(20.0));
        assert_eq!(format!("{:.2}", stats.mean.unwrap()), "20.00");
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(30.0));
    }

    #[test]
    fn test_mean_of_two_rates() {
        let records = vec![ok_record(0, 5.0), ok_record(1, 7.0)];
        let stats = PhaseStats::from_records(&records);
        assert_eq!(stats.mean, Some(6.0));
        assert_eq!(format!("{:.2}", stats.mean.unwrap()), "6.00");
    }

    #[test]
    fn test_constant_rate_mean_is_exact() {
        let records: Vec<RunRecord> = (0..7).map(|i| ok_record(i, 77.75)).collect();
        let stats = PhaseStats::from_records(&records);
        assert_eq!(stats.mean, Some(77.75));
    }

    #[test]
    fn test_failed_runs_are_excluded_from_mean() {
        let records = vec![ok_record(0, 10.0), failed_record(1), ok_record(2, 30.0)];
        let stats = PhaseStats::from_records(&records);
        assert_eq!(stats.runs, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.mean, Some(20.0));
    }

    #[test]
    fn test_all_failed_yields_no_mean() {
        let records = vec![failed_record(0), failed_record(1)];
        let stats = PhaseStats::from_records(&records);
        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.min, None);
        assert_eq!(stats.max, None);
    }

    #[test]
    fn test_empty_records() {
        let stats = PhaseStats::from_records(&[]);
        assert_eq!(stats.runs, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.mean_duration, Duration::ZERO);
    }

    #[test]
    fn test_mean_duration() {
        let records = vec![
            RunRecord {
                index: 0,
                duration: Duration::from_millis(100),
                eval_rate: Ok(1.0),
            },
            RunRecord {
                index: 1,
                duration: Duration::from_millis(300),
                eval_rate: Ok(1.0),
            },
        ];
        let stats = PhaseStats::from_records(&records);
        assert_eq!(stats.mean_duration, Duration::from_millis(200));
    }
}
