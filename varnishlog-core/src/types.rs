//! Domain types for varnishlog convergence.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! [`DesiredLogConfig`] can only be obtained through [`DesiredLogConfigBuilder::build`],
//! so every instance in circulation is already validated.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_FILE_NAME: &str = "/var/log/varnish/varnishlog.log";
pub const DEFAULT_LOGROTATE_PATH: &str = "/etc/logrotate.d";
pub const DEFAULT_PID_PATH: &str = "/var/run/varnishlog.pid";
/// Apache-combined-like pattern; the backslashes are part of the value.
pub const DEFAULT_NCSA_FORMAT: &str =
    r#"%h|%l|%u|%t|\"%r\"|%s|%b|\"%{Referer}i\"|\"%{User-agent}i\""#;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which logging companion of varnishd to run. Doubles as the service name
/// and the file name of every artifact written for the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Varnishlog,
    Varnishncsa,
}

impl LogFormat {
    pub fn all() -> &'static [LogFormat] {
        &[LogFormat::Varnishlog, LogFormat::Varnishncsa]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Varnishlog => "varnishlog",
            LogFormat::Varnishncsa => "varnishncsa",
        }
    }

    /// Name of the OS service driven by this format.
    pub fn service_name(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "varnishlog" => Ok(LogFormat::Varnishlog),
            "varnishncsa" => Ok(LogFormat::Varnishncsa),
            other => Err(ValidationError::InvalidLogFormat {
                value: other.to_owned(),
            }),
        }
    }
}

/// Template flavour handed to the file renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVariant {
    /// Shell-style environment file (`/etc/default`, `/etc/sysconfig`).
    Default,
    /// Parameter file read by the systemd unit.
    Systemd,
    /// logrotate policy.
    Logrotate,
}

impl TemplateVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateVariant::Default => "default",
            TemplateVariant::Systemd => "systemd",
            TemplateVariant::Logrotate => "logrotate",
        }
    }
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Platform facts + derived plan
// ---------------------------------------------------------------------------

/// Host facts the caller supplies for a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformContext {
    /// e.g. `debian`, `rhel`, `suse`.
    pub platform_family: String,
    /// e.g. `systemd`, `init`, `upstart`.
    pub init_system: String,
}

impl PlatformContext {
    pub fn new(platform_family: impl Into<String>, init_system: impl Into<String>) -> Self {
        Self {
            platform_family: platform_family.into(),
            init_system: init_system.into(),
        }
    }

    pub fn is_debian_family(&self) -> bool {
        self.platform_family == "debian"
    }

    pub fn is_systemd(&self) -> bool {
        self.init_system == "systemd"
    }
}

/// Where the main config goes and which template renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplatePlan {
    pub destination_path: PathBuf,
    pub variant: TemplateVariant,
}

// ---------------------------------------------------------------------------
// DesiredLogConfig
// ---------------------------------------------------------------------------

/// Validated desired state for one logging resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredLogConfig {
    name: String,
    file_name: PathBuf,
    logrotate: bool,
    logrotate_path: PathBuf,
    pid: PathBuf,
    log_format: LogFormat,
    ncsa_format_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_name: Option<String>,
}

impl DesiredLogConfig {
    /// Start building a config keyed by `name`; every other field has a default.
    pub fn builder(name: impl Into<String>) -> DesiredLogConfigBuilder {
        DesiredLogConfigBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn logrotate(&self) -> bool {
        self.logrotate
    }

    pub fn logrotate_path(&self) -> &Path {
        &self.logrotate_path
    }

    pub fn pid(&self) -> &Path {
        &self.pid
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn ncsa_format_string(&self) -> &str {
        &self.ncsa_format_string
    }

    pub fn instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    /// `{logrotate_path}/{log_format}`
    pub fn logrotate_destination(&self) -> PathBuf {
        self.logrotate_path.join(self.log_format.as_str())
    }
}

/// Builder for [`DesiredLogConfig`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct DesiredLogConfigBuilder {
    name: String,
    file_name: PathBuf,
    logrotate: bool,
    logrotate_path: PathBuf,
    pid: PathBuf,
    log_format: Result<LogFormat, ValidationError>,
    ncsa_format_string: String,
    instance_name: Option<String>,
}

impl DesiredLogConfigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: PathBuf::from(DEFAULT_FILE_NAME),
            logrotate: true,
            logrotate_path: PathBuf::from(DEFAULT_LOGROTATE_PATH),
            pid: PathBuf::from(DEFAULT_PID_PATH),
            log_format: Ok(LogFormat::default()),
            ncsa_format_string: DEFAULT_NCSA_FORMAT.to_owned(),
            instance_name: None,
        }
    }

    pub fn file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_name = path.into();
        self
    }

    pub fn logrotate(mut self, enabled: bool) -> Self {
        self.logrotate = enabled;
        self
    }

    pub fn logrotate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.logrotate_path = path.into();
        self
    }

    pub fn pid(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid = path.into();
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Ok(format);
        self
    }

    /// Parse the format from user input; an unknown value surfaces from `build`.
    pub fn log_format_str(mut self, format: &str) -> Self {
        self.log_format = format.parse();
        self
    }

    pub fn ncsa_format_string(mut self, format: impl Into<String>) -> Self {
        self.ncsa_format_string = format.into();
        self
    }

    pub fn instance_name(mut self, instance: Option<String>) -> Self {
        self.instance_name = instance;
        self
    }

    pub fn build(self) -> Result<DesiredLogConfig, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let log_format = self.log_format?;
        Ok(DesiredLogConfig {
            name: self.name,
            file_name: self.file_name,
            logrotate: self.logrotate,
            logrotate_path: self.logrotate_path,
            pid: self.pid,
            log_format,
            ncsa_format_string: self.ncsa_format_string,
            instance_name: self.instance_name,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
