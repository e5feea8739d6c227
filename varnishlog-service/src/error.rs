use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single service-manager primitive.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid service name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    /// A failed command or a spawn error such as ETXTBSY may heal on retry.
    /// A missing or non-executable binary, a bad name and an unreadable rc
    /// directory do not.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::CommandFailed { .. } => true,
            ServiceError::Spawn { source, .. } => !matches!(
                source.kind(),
                ErrorKind::NotFound | ErrorKind::PermissionDenied
            ),
            ServiceError::InvalidName { .. } | ServiceError::Io { .. } => false,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ServiceError {
    ServiceError::Io {
        path: path.into(),
        source,
    }
}

/// Lifecycle operation wrapped by the retry guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Restart,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Start => f.write_str("start"),
            LifecycleAction::Restart => f.write_str("restart"),
        }
    }
}

/// A guarded start/restart that did not succeed.
#[derive(Debug, Error)]
#[error("{action} of service '{service_name}' failed after {attempts} attempt(s): {last_error}")]
pub struct ServiceLifecycleError {
    pub service_name: String,
    pub action: LifecycleAction,
    pub attempts: u32,
    #[source]
    pub last_error: ServiceError,
}
