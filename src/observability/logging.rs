//! Logging initialization for `sortie`.
//!
//! Structured logging via `tracing` with human-readable and JSON output.
//! Verbosity raises the crate's own modules first: `-v` shows level and
//! phase progress, `-vv` adds event arming and host calls, `-vvv` adds
//! per-notification store traffic and timer scheduling. Dependencies
//! stay at `warn` until `-vvvv`. `SORTIE_LOG_LEVEL` overrides all of it.

use std::io::IsTerminal;

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Maps a verbosity level to a tracing directive string.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,sortie=info",
        2 => "warn,sortie=debug,sortie::state=info,sortie::schedule=info",
        3 => "warn,sortie=trace",
        _ => "trace",
    }
}

/// Initializes the global tracing subscriber on stderr.
///
/// `SORTIE_LOG_LEVEL`, when set, takes precedence over `verbosity`.
/// Uses `try_init()`, so repeated calls are ignored.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env("SORTIE_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));

    let show_target = verbosity >= 2;

    let use_ansi = match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    match format {
        LogFormat::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(use_ansi)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
