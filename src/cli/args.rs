//! CLI argument definitions
//!
//! All Clap derive structs for `sortie` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Headless runner and validator for scripted shooter levels.
#[derive(Parser, Debug)]
#[command(name = "sortie", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "SORTIE_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true, env = "SORTIE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate a level script against a headless host.
    Run(RunArgs),

    /// Validate level scripts without running them.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Run
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the YAML level script.
    pub level: PathBuf,

    /// Countdown length in seconds, overriding the script (0 disables).
    #[arg(long)]
    pub countdown: Option<u32>,

    /// Simulated broadcast, as `KEY[=VALUE]@TIME` (repeatable).
    ///
    /// VALUE is parsed as YAML; an `enemy_died` without a value carries a
    /// placeholder enemy.
    #[arg(long = "inform", value_name = "KEY[=VALUE]@TIME")]
    pub informs: Vec<String>,

    /// Stop the simulation after this much level time.
    #[arg(long = "for", default_value = "5m", value_name = "DURATION")]
    pub limit: String,

    /// Length of one simulated frame.
    #[arg(long, default_value = "16ms", value_name = "DURATION")]
    pub frame: String,

    /// Pace frames in wall-clock time instead of running flat out.
    #[arg(long)]
    pub realtime: bool,

    /// Output format for the run summary.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Validate / Version
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Level scripts to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}
