use thiserror::Error;

/// Main error type for evalbench operations
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("server binary '{0}' could not be found")]
    ServerNotFound(String),

    #[error("no metric could be extracted from any run in the {0} phase")]
    NoMetrics(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BenchError {
    /// Stable error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            BenchError::InvalidArgs(_) => "invalid_args",
            BenchError::ServerNotFound(_) => "server_not_found",
            BenchError::NoMetrics(_) => "no_metrics",
            BenchError::Io(_) => "io_error",
            BenchError::TomlParse(_) => "invalid_args",
            BenchError::Internal(_) => "internal_error",
        }
    }

    /// Get the exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::InvalidArgs(_) => 2,
            BenchError::TomlParse(_) => 2,
            BenchError::ServerNotFound(_) => 3,
            _ => 1,
        }
    }

    /// Get actionable suggestions for fixing the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            BenchError::ServerNotFound(_) => vec![
                "Install the inference server or add it to PATH",
                "Or point at the binary with '--server-bin /path/to/binary'",
            ],
            BenchError::NoMetrics(_) => vec![
                "Check that the model name is valid ('<server> list')",
                "Run with '--log-level debug' to see the captured output",
            ],
            _ => vec![],
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
