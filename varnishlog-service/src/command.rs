//! Thin wrapper over `std::process::Command` shared by both managers.

use std::path::Path;
use std::process::{Command, Output};

use crate::error::ServiceError;

fn describe(program: &Path, args: &[&str]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run `program args…` and return its output whatever the exit status.
pub(crate) fn run(program: &Path, args: &[&str]) -> Result<Output, ServiceError> {
    tracing::debug!(command = %describe(program, args), "running");
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ServiceError::Spawn {
            program: program.display().to_string(),
            source: e,
        })
}

/// Run `program args…`; a non-zero exit becomes [`ServiceError::CommandFailed`].
pub(crate) fn run_checked(program: &Path, args: &[&str]) -> Result<(), ServiceError> {
    let output = run(program, args)?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(ServiceError::CommandFailed {
        command: describe(program, args),
        status: output.status.to_string(),
        stderr: if stderr.is_empty() { stdout } else { stderr },
    })
}

/// Run a query command; exit status 0 means "yes", anything else "no".
pub(crate) fn run_query(program: &Path, args: &[&str]) -> Result<bool, ServiceError> {
    Ok(run(program, args)?.status.success())
}
