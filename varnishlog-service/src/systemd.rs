//! `systemctl`-backed manager.

use std::path::{Path, PathBuf};

use crate::command::{run_checked, run_query};
use crate::error::ServiceError;
use crate::manager::{validate_service_name, ServiceManager};

/// Drives units through `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdManager {
    systemctl: PathBuf,
    base_args: Vec<String>,
}

impl SystemdManager {
    pub fn new() -> Self {
        Self::with_program("systemctl")
    }

    /// Use a specific `systemctl` binary (absolute path or name on `$PATH`).
    pub fn with_program(systemctl: impl Into<PathBuf>) -> Self {
        Self::with_command(systemctl, Vec::new())
    }

    /// Use `program base_args… <verb> <unit>`, e.g. `systemctl --user`.
    pub fn with_command(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            systemctl: program.into(),
            base_args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.systemctl
    }

    fn argv<'a>(&'a self, rest: &[&'a str]) -> Vec<&'a str> {
        self.base_args
            .iter()
            .map(String::as_str)
            .chain(rest.iter().copied())
            .collect()
    }

    fn act(&self, verb: &str, name: &str) -> Result<(), ServiceError> {
        validate_service_name(name)?;
        run_checked(&self.systemctl, &self.argv(&[verb, name]))
    }

    fn query(&self, verb: &str, name: &str) -> Result<bool, ServiceError> {
        validate_service_name(name)?;
        run_query(&self.systemctl, &self.argv(&[verb, "--quiet", name]))
    }
}

impl Default for SystemdManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager for SystemdManager {
    fn kind(&self) -> &'static str {
        "systemd"
    }

    fn enable(&self, name: &str) -> Result<(), ServiceError> {
        self.act("enable", name)
    }

    fn start(&self, name: &str) -> Result<(), ServiceError> {
        self.act("start", name)
    }

    fn restart(&self, name: &str) -> Result<(), ServiceError> {
        self.act("restart", name)
    }

    fn reload(&self, name: &str) -> Result<(), ServiceError> {
        self.act("reload", name)
    }

    fn is_enabled(&self, name: &str) -> Result<bool, ServiceError> {
        self.query("is-enabled", name)
    }

    fn is_active(&self, name: &str) -> Result<bool, ServiceError> {
        self.query("is-active", name)
    }
}
