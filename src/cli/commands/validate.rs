//! Level script validation (`sortie validate`)

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::{ConfigError, Severity, SortieError, ValidationIssue};

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Checks one level script. In strict mode warnings fail the file.
#[must_use]
pub fn check(loader: &ConfigLoader, path: &Path, strict: bool) -> FileReport {
    let file = path.display().to_string();
    let (errors, warnings) = match loader.load(path) {
        Ok(loaded) if strict => (loaded.warnings.clone(), loaded.warnings),
        Ok(loaded) => (Vec::new(), loaded.warnings),
        Err(ConfigError::ValidationError { errors, .. }) => (errors, Vec::new()),
        Err(other) => (
            vec![ValidationIssue {
                path: file.clone(),
                message: other.to_string(),
                severity: Severity::Error,
            }],
            Vec::new(),
        ),
    };

    FileReport {
        file,
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Validates every file and prints a report.
///
/// # Errors
///
/// Returns a validation error naming the first failing file.
pub fn run(args: &ValidateArgs) -> Result<(), SortieError> {
    let loader = ConfigLoader::with_defaults();
    let reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| {
            info!(file = %path.display(), "validating level script");
            check(&loader, path, args.strict)
        })
        .collect();

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                print_human(report);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    match reports.into_iter().find(|r| !r.valid) {
        Some(failed) => Err(ConfigError::ValidationError {
            path: failed.file,
            errors: failed.errors,
        }
        .into()),
        None => Ok(()),
    }
}

fn print_human(report: &FileReport) {
    let status = if report.valid { "ok" } else { "FAILED" };
    println!("{}: {status}", report.file);
    for issue in report.errors.iter().chain(&report.warnings) {
        println!("  {issue}");
    }
}
