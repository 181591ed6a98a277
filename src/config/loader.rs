//! Level script loader
//!
//! Loading pipeline:
//! 1. Size check against [`LoaderLimits`]
//! 2. Read, strip UTF-8 BOM
//! 3. YAML parsing into [`LevelConfig`]
//! 4. Validation (all issues collected)

use std::path::Path;

use tracing::debug;

use crate::config::schema::LevelConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Limits on level script size.
#[derive(Debug, Clone)]
pub struct LoaderLimits {
    /// Maximum number of phases.
    pub max_phases: usize,

    /// Maximum number of events across all phases, chained ones included.
    pub max_events: usize,

    /// Maximum length of a single `then` chain.
    pub max_chain_depth: usize,

    /// Maximum level script size in bytes.
    pub max_file_size: usize,
}

impl Default for LoaderLimits {
    fn default() -> Self {
        Self {
            max_phases: env_or("SORTIE_MAX_PHASES", 100),
            max_events: env_or("SORTIE_MAX_EVENTS", 1000),
            max_chain_depth: env_or("SORTIE_MAX_CHAIN_DEPTH", 64),
            max_file_size: env_or("SORTIE_MAX_FILE_SIZE", 1024 * 1024),
        }
    }
}

/// A loaded and validated level script.
#[derive(Debug)]
pub struct LoadResult {
    pub config: LevelConfig,

    /// Warnings found during validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Level script loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: LoaderLimits,
}

impl ConfigLoader {
    #[must_use]
    pub const fn new(limits: LoaderLimits) -> Self {
        Self { limits }
    }

    /// Creates a loader with default (environment-derived) limits.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderLimits::default())
    }

    #[must_use]
    pub const fn limits(&self) -> &LoaderLimits {
        &self.limits
    }

    /// Loads and validates a level script file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file exceeds the size limit
    /// - YAML parsing fails
    /// - Validation finds errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.limits.max_file_size {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.limits.max_file_size,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, path)
    }

    /// Parses and validates level script text. `path` is only used in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if YAML parsing or validation fails.
    pub fn load_str(&self, content: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        if content.trim().is_empty() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "level script is empty".to_string(),
            });
        }

        let config: LevelConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let result = Validator::new().validate(&config, &self.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        debug!(
            path = %path.display(),
            phases = config.phases.len(),
            warnings = result.warnings.len(),
            "level script loaded"
        );

        Ok(LoadResult {
            config,
            warnings: result.warnings,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reads `name` from the environment, falling back to `default` when
/// unset or unparseable.
pub(crate) fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const VALID: &str = r"
level:
  name: smoke
phases:
  - name: only
    events:
      - when: { after: 1s }
        execute:
          - display: done
";

    fn loader() -> ConfigLoader {
        ConfigLoader::new(LoaderLimits {
            max_phases: 10,
            max_events: 10,
            max_chain_depth: 4,
            max_file_size: 4096,
        })
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();

        let result = loader().load(file.path()).unwrap();
        assert_eq!(result.config.level.name, "smoke");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = loader().load(Path::new("/nonexistent/level.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_too_large() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![b'#'; 5000]).unwrap();

        let err = loader().load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge { size: 5000, .. }));
    }

    #[test]
    fn test_bom_is_stripped() {
        let content = format!("\u{feff}{VALID}");
        assert!(loader().load_str(&content, Path::new("bom.yaml")).is_ok());
    }

    #[test]
    fn test_empty_script() {
        let err = loader().load_str("  \n", Path::new("empty.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_parse_error_has_line() {
        let err = loader()
            .load_str("level:\n  name: [unclosed\n", Path::new("bad.yaml"))
            .unwrap_err();
        match err {
            ConfigError::ParseError { line, .. } => assert!(line.is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validation_errors_surface() {
        let yaml = "level: { name: '' }";
        let err = loader().load_str(yaml, Path::new("nameless.yaml")).unwrap_err();
        match err {
            ConfigError::ValidationError { errors, .. } => {
                assert!(errors.iter().any(|e| e.path == "level.name"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
