//! varnishlog core library: desired-state types and the YAML loader.
//!
//! - [`types`]: [`DesiredLogConfig`], [`LogFormat`], [`PlatformContext`], plans
//! - [`error`]: [`ValidationError`], [`ConfigError`]
//! - [`config`]: load the YAML desired-state file

pub mod config;
pub mod error;
pub mod types;

pub use error::{ConfigError, ValidationError};
pub use types::{
    DesiredLogConfig, DesiredLogConfigBuilder, LogFormat, PlatformContext, TemplatePlan,
    TemplateVariant, DEFAULT_FILE_NAME, DEFAULT_LOGROTATE_PATH, DEFAULT_NCSA_FORMAT,
    DEFAULT_PID_PATH,
};
