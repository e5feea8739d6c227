//! Error types for varnishlog-core.

use std::path::PathBuf;

use thiserror::Error;

/// Rejected desired state. Raised while building a [`crate::DesiredLogConfig`],
/// so nothing downstream ever sees an invalid value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The resource name (its unique key) was empty or blank.
    #[error("resource name must not be empty")]
    EmptyName,

    /// `log_format` was not one of the supported companions.
    #[error("invalid log_format '{value}'; expected one of: varnishlog, varnishncsa")]
    InvalidLogFormat { value: String },

    /// Two resources in the same desired-state file share a name.
    #[error("duplicate resource name '{name}'")]
    DuplicateName { name: String },
}

/// All errors that can arise while loading a desired-state file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// YAML parse error; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An entry parsed fine but failed validation.
    #[error("invalid config at {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}
