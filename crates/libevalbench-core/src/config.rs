//! Benchmark configuration and the optional `evalbench.toml` defaults file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::report::OutputFormat;
use crate::server::ServerCommand;

/// Prompt used when none is configured
pub const DEFAULT_PROMPT: &str = "Why is the sky blue?";

/// Default number of runs per phase
pub const DEFAULT_RUNS: usize = 5;

/// Request and loading limits applied to the inference server.
///
/// Kept as an explicit struct; the values become environment variables only
/// on the spawned child process (see [`ServerCommand`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLimits {
    /// Maximum number of models kept loaded concurrently
    pub max_loaded_models: u32,
    /// Maximum parallel requests per loaded model
    pub num_parallel: u32,
    /// Context window size in tokens
    pub context_length: u32,
    /// Maximum queued requests before the server rejects new ones
    pub max_queue: u32,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_loaded_models: 2,
            num_parallel: 2,
            context_length: 4096,
            max_queue: 256,
        }
    }
}

impl ServerLimits {
    /// The environment variables the server reads, with their values
    pub fn env_vars(&self) -> [(&'static str, String); 4] {
        [
            ("OLLAMA_MAX_LOADED_MODELS", self.max_loaded_models.to_string()),
            ("OLLAMA_NUM_PARALLEL", self.num_parallel.to_string()),
            ("OLLAMA_CONTEXT_LENGTH", self.context_length.to_string()),
            ("OLLAMA_MAX_QUEUE", self.max_queue.to_string()),
        ]
    }
}

/// Full configuration for one benchmark invocation
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Model identifier passed to the server's `run` subcommand
    pub model: String,
    /// Prompt text sent on every run
    pub prompt: String,
    /// Number of serial-phase runs
    pub serial_runs: usize,
    /// Number of parallel-phase runs
    pub parallel_runs: usize,
    /// Discarded serial invocations before measurement starts
    pub warmup_runs: usize,
    /// Report rendering
    pub format: OutputFormat,
    /// The external server binary
    pub server: ServerCommand,
    /// Limits forwarded to the server
    pub limits: ServerLimits,
}

impl BenchConfig {
    /// Validate run counts before any phase starts.
    ///
    /// A zero run count would make the phase average meaningless, so it is
    /// rejected here rather than guarded at the division.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(BenchError::InvalidArgs("model must not be empty".to_string()));
        }
        if self.serial_runs == 0 {
            return Err(BenchError::InvalidArgs(
                "serial run count must be at least 1".to_string(),
            ));
        }
        if self.parallel_runs == 0 {
            return Err(BenchError::InvalidArgs(
                "parallel run count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Defaults file (`evalbench.toml`); every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_runs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_runs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmup_runs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_bin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<FileLimits>,
}

/// Limits section of the defaults file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_loaded_models: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_parallel: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue: Option<u32>,
}

impl FileConfig {
    /// Fold these file-level defaults into `limits`, file value winning only
    /// where set
    pub fn apply_limits(&self, limits: &mut ServerLimits) {
        let Some(ref file) = self.limits else { return };
        if let Some(v) = file.max_loaded_models {
            limits.max_loaded_models = v;
        }
        if let Some(v) = file.num_parallel {
            limits.num_parallel = v;
        }
        if let Some(v) = file.context_length {
            limits.context_length = v;
        }
        if let Some(v) = file.max_queue {
            limits.max_queue = v;
        }
    }
}

/// Load the defaults file if present. A missing file is not an error.
pub fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(Some(config))
}
