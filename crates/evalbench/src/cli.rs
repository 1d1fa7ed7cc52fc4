use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use libevalbench_core::OutputFormat;

#[derive(Parser)]
#[command(
    name = "evalbench",
    about = "Serial and parallel throughput benchmark for a local LLM inference server",
    version
)]
pub struct Cli {
    /// Model to benchmark (prompted for when omitted)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Number of serial runs
    #[arg(short = 'n', long)]
    pub runs: Option<usize>,

    /// Number of parallel runs
    #[arg(short = 'p', long)]
    pub parallel: Option<usize>,

    /// Prompt text sent on every run
    #[arg(long)]
    pub prompt: Option<String>,

    /// Discarded warmup runs before the serial phase
    #[arg(long)]
    pub warmup: Option<usize>,

    /// Maximum number of concurrently loaded models
    #[arg(long)]
    pub max_loaded: Option<u32>,

    /// Maximum parallel requests per loaded model
    #[arg(long)]
    pub num_parallel: Option<u32>,

    /// Context window size in tokens
    #[arg(long)]
    pub context_size: Option<u32>,

    /// Maximum request queue depth
    #[arg(long)]
    pub queue_size: Option<u32>,

    /// Path or command name of the inference server binary
    #[arg(long)]
    pub server_bin: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value = "plain")]
    pub format: FormatArg,

    /// Shorthand for --format markdown
    #[arg(long)]
    pub markdown: bool,

    /// Run with defaults, never prompting
    #[arg(short = 'd', long)]
    pub defaults: bool,

    /// Path to the defaults file
    #[arg(long, default_value = "evalbench.toml")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Suppress report output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Plain,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Plain => OutputFormat::Plain,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

impl Cli {
    /// Effective report format, with `--markdown` winning over `--format`
    pub fn output_format(&self) -> OutputFormat {
        if self.markdown {
            OutputFormat::Markdown
        } else {
            self.format.into()
        }
    }
}
