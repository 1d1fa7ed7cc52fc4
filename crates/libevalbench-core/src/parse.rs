//! Extraction of the eval-rate metric from the server's verbose output.

use thiserror::Error;

/// Label tokens that open the throughput line in `--verbose` output.
const EVAL_RATE_LABEL: [&str; 2] = ["eval", "rate:"];

/// Errors produced while scraping the metric from one invocation's output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    #[error("no 'eval rate' line in output")]
    NotFound,

    #[error("'eval rate' line is malformed: {0:?}")]
    Malformed(String),
}

/// Extract the tokens-per-second figure from one invocation's diagnostic
/// output.
///
/// The server prints a line of the form `eval rate:  77.75 tokens/s`; the
/// value is the third whitespace-delimited token. The `prompt eval rate:`
/// line that precedes it must not match.
pub fn parse_eval_rate(output: &str) -> Result<f64, MetricError> {
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(EVAL_RATE_LABEL[0]) {
            continue;
        }
        if tokens.next() != Some(EVAL_RATE_LABEL[1]) {
            continue;
        }
        let value = tokens
            .next()
            .ok_or_else(|| MetricError::Malformed(line.trim().to_string()))?;
        return value
            .parse::<f64>()
            .map_err(|_| MetricError::Malformed(line.trim().to_string()));
    }
    Err(MetricError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERBOSE_OUTPUT: &str = "\
total duration:       2.62s
load duration:        1.05ms
prompt eval count:    26 token(s)
prompt eval duration: 150ms
prompt eval rate:     173.33 tokens/s
eval count:           110 token(s)
eval duration:        1.41s
eval rate:            77.75 tokens/s
";

    #[test]
    fn extracts_third_field_from_eval_rate_line() {
        assert_eq!(parse_eval_rate(VERBOSE_OUTPUT), Ok(77.75));
    }

    #[test]
    fn prompt_eval_rate_line_does_not_match() {
        // Only the prompt-side line is present; the decode rate is missing.
        let output = "prompt eval rate:     173.33 tokens/s\n";
        assert_eq!(parse_eval_rate(output), Err(MetricError::NotFound));
    }

    #[test]
    fn missing_label_is_not_found() {
        assert_eq!(
            parse_eval_rate("model failed to load\n"),
            Err(MetricError::NotFound)
        );
        assert_eq!(parse_eval_rate(""), Err(MetricError::NotFound));
    }

    #[test]
    fn non_numeric_value_is_malformed() {
        let output = "eval rate: fast tokens/s\n";
        assert!(matches!(
            parse_eval_rate(output),
            Err(MetricError::Malformed(_))
        ));
    }

    #[test]
    fn truncated_line_is_malformed() {
        assert!(matches!(
            parse_eval_rate("eval rate:\n"),
            Err(MetricError::Malformed(_))
        ));
    }

    #[test]
    fn first_matching_line_wins() {
        let output = "eval rate: 10.5 tokens/s\neval rate: 99.0 tokens/s\n";
        assert_eq!(parse_eval_rate(output), Ok(10.5));
    }

    #[test]
    fn handles_ragged_whitespace() {
        assert_eq!(parse_eval_rate("  eval   rate:\t42.01 tokens/s"), Ok(42.01));
    }
}
