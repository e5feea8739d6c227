//! Desired-state file loading.
//!
//! # File layout
//!
//! ```yaml
//! logs:
//!   - name: access
//!     log_format: varnishncsa
//!     file_name: /var/log/varnish/varnishncsa.log
//!     logrotate: true
//!   - name: debug
//!     log_format: varnishlog
//! ```
//!
//! Keys left out take the [`DesiredLogConfig`] defaults. Every entry is validated
//! before the function returns; a file with one bad entry yields no configs at all.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, ValidationError};
use crate::types::DesiredLogConfig;

/// Default location of the desired-state file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/varnishlog-converge/config.yaml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    logs: Vec<LogEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogEntry {
    name: String,
    file_name: Option<PathBuf>,
    logrotate: Option<bool>,
    logrotate_path: Option<PathBuf>,
    pid: Option<PathBuf>,
    log_format: Option<String>,
    ncsa_format_string: Option<String>,
    instance_name: Option<String>,
}

impl LogEntry {
    fn into_config(self) -> Result<DesiredLogConfig, ValidationError> {
        let mut builder = DesiredLogConfig::builder(self.name).instance_name(self.instance_name);
        if let Some(path) = self.file_name {
            builder = builder.file_name(path);
        }
        if let Some(enabled) = self.logrotate {
            builder = builder.logrotate(enabled);
        }
        if let Some(path) = self.logrotate_path {
            builder = builder.logrotate_path(path);
        }
        if let Some(path) = self.pid {
            builder = builder.pid(path);
        }
        if let Some(format) = self.log_format {
            builder = builder.log_format_str(&format);
        }
        if let Some(format) = self.ncsa_format_string {
            builder = builder.ncsa_format_string(format);
        }
        builder.build()
    }
}

/// Load and validate every resource declared in the YAML file at `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path +
/// line context) if malformed, `ConfigError::Invalid` if an entry fails validation.
pub fn load_at(path: &Path) -> Result<Vec<DesiredLogConfig>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(path, &contents)
}

/// `load_at` convenience wrapper for [`DEFAULT_CONFIG_PATH`].
pub fn load() -> Result<Vec<DesiredLogConfig>, ConfigError> {
    load_at(Path::new(DEFAULT_CONFIG_PATH))
}

/// Parse YAML text; `path` is only used for error context.
pub fn parse(path: &Path, contents: &str) -> Result<Vec<DesiredLogConfig>, ConfigError> {
    let file: ConfigFile = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let invalid = |source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    };

    let mut seen = HashSet::new();
    let mut configs = Vec::with_capacity(file.logs.len());
    for entry in file.logs {
        let config = entry.into_config().map_err(invalid)?;
        if !seen.insert(config.name().to_owned()) {
            return Err(invalid(ValidationError::DuplicateName {
                name: config.name().to_owned(),
            }));
        }
        configs.push(config);
    }
    Ok(configs)
}
