//! Template context: serializable rendering payload built from [`DesiredLogConfig`].

use serde::{Deserialize, Serialize};

use varnishlog_core::DesiredLogConfig;

use crate::error::RenderError;

/// Variables exposed to every template.
///
/// Service templates get the cache-engine version; the logrotate policy does not
/// depend on it and leaves both version fields empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub config: ConfigCtx,
    pub varnish_version: Option<String>,
    /// Leading numeric component of `varnish_version`, when it parses.
    pub varnish_major: Option<u32>,
}

/// String-flattened view of the desired state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCtx {
    pub name: String,
    pub file_name: String,
    pub logrotate: bool,
    pub logrotate_path: String,
    pub pid: String,
    pub log_format: String,
    pub ncsa_format_string: String,
    pub instance_name: Option<String>,
}

impl ConfigCtx {
    fn from_config(config: &DesiredLogConfig) -> Self {
        ConfigCtx {
            name: config.name().to_owned(),
            file_name: config.file_name().display().to_string(),
            logrotate: config.logrotate(),
            logrotate_path: config.logrotate_path().display().to_string(),
            pid: config.pid().display().to_string(),
            log_format: config.log_format().to_string(),
            ncsa_format_string: config.ncsa_format_string().to_owned(),
            instance_name: config.instance_name().map(str::to_owned),
        }
    }
}

impl TemplateContext {
    /// Context for the main service configuration file.
    pub fn for_service(config: &DesiredLogConfig, varnish_version: &str) -> Self {
        TemplateContext {
            config: ConfigCtx::from_config(config),
            varnish_version: Some(varnish_version.to_owned()),
            varnish_major: major_version(varnish_version),
        }
    }

    /// Context for the logrotate policy.
    pub fn for_logrotate(config: &DesiredLogConfig) -> Self {
        TemplateContext {
            config: ConfigCtx::from_config(config),
            varnish_version: None,
            varnish_major: None,
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

fn major_version(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}
