//! Invocation of the external inference server binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::config::ServerLimits;
use crate::error::{BenchError, Result};

/// Default server command, looked up through PATH
pub const DEFAULT_SERVER_BIN: &str = "ollama";

/// The external inference server binary, by bare command name or path
#[derive(Debug, Clone)]
pub struct ServerCommand {
    command: String,
}

impl Default for ServerCommand {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_BIN)
    }
}

impl ServerCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The configured command string, as given
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check that the binary exists, before anything else runs.
    ///
    /// An explicit path must point at a file; a bare command name must
    /// resolve through PATH.
    pub fn resolve(&self) -> Result<PathBuf> {
        let candidate = Path::new(&self.command);
        if candidate.components().count() > 1 {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
            return Err(BenchError::ServerNotFound(self.command.clone()));
        }

        let path_var = std::env::var_os("PATH").unwrap_or_default();
        for dir in std::env::split_paths(&path_var) {
            let resolved = dir.join(&self.command);
            if resolved.is_file() {
                return Ok(resolved);
            }
            #[cfg(windows)]
            {
                let exe = dir.join(format!("{}.exe", self.command));
                if exe.is_file() {
                    return Ok(exe);
                }
            }
        }
        Err(BenchError::ServerNotFound(self.command.clone()))
    }

    /// Run one inference invocation: `<bin> run <model> --verbose <prompt>`.
    ///
    /// The limits are applied as environment variables on the child only;
    /// the harness process environment is never mutated. Both output streams
    /// are captured (the throughput figures land on the diagnostic stream).
    pub fn run_prompt(
        &self,
        model: &str,
        prompt: &str,
        limits: &ServerLimits,
    ) -> std::io::Result<Output> {
        debug!(command = %self.command, model, "invoking server");
        let mut cmd = Command::new(&self.command);
        cmd.arg("run")
            .arg(model)
            .arg("--verbose")
            .arg(prompt)
            .stdin(Stdio::null());
        for (name, value) in limits.env_vars() {
            cmd.env(name, value);
        }
        cmd.output()
    }

    /// List locally available models via the server's `list` subcommand.
    ///
    /// The first whitespace-delimited column of each row is the model name;
    /// the header row is skipped.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.command)
            .arg("list")
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(BenchError::Internal(format!(
                "'{} list' failed: {}",
                self.command,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let models = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !line.trim_start().starts_with("NAME"))
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect();
        Ok(models)
    }
}

/// Persist the limits into the user's session environment.
///
/// Only Windows has a session-wide environment registry; elsewhere the
/// limits exist solely on the spawned children.
#[cfg(windows)]
pub fn persist_limits(limits: &ServerLimits) {
    use tracing::warn;

    for (name, value) in limits.env_vars() {
        let result = Command::new("setx")
            .arg(name)
            .arg(&value)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match result {
            Ok(status) if status.success() => {
                debug!(name, value = %value, "persisted to user environment");
            }
            Ok(status) => warn!(name, ?status, "setx failed"),
            Err(e) => warn!(name, error = %e, "setx could not be started"),
        }
    }
}

#[cfg(not(windows))]
pub fn persist_limits(_limits: &ServerLimits) {
    debug!("no session environment registry on this platform, skipping");
}
