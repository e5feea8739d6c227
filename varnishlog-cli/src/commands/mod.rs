pub mod apply;
pub mod detect;
pub mod plan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use varnishlog_core::{config, DesiredLogConfig, PlatformContext};
use varnishlog_detector::{init_system_at, platform_family_at};
use varnishlog_service::{manager_for, InitScriptManager, ServiceManager};

/// Host facts, detected unless given explicitly.
#[derive(Args, Debug, Clone, Default)]
pub struct FactsArgs {
    /// Operate on the tree under DIR instead of `/` (files, probes, init scripts).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Platform family, e.g. `debian` or `rhel` (default: from os-release).
    #[arg(long, value_name = "FAMILY")]
    pub platform_family: Option<String>,

    /// Init system, e.g. `systemd` (default: name of PID 1).
    #[arg(long, value_name = "INIT")]
    pub init_system: Option<String>,
}

impl FactsArgs {
    pub fn detection_root(&self) -> &Path {
        self.root.as_deref().unwrap_or(Path::new("/"))
    }

    pub fn platform(&self) -> Result<PlatformContext> {
        let root = self.detection_root();
        let family = match &self.platform_family {
            Some(family) => family.clone(),
            None => platform_family_at(root)
                .context("could not detect the platform family; pass --platform-family")?,
        };
        let init = self
            .init_system
            .clone()
            .unwrap_or_else(|| init_system_at(root));
        Ok(PlatformContext::new(family, init))
    }

    /// Manager for `platform`. Under `--root`, init scripts and rc links are
    /// looked up inside the root; systemd always talks to the running manager.
    pub fn service_manager(&self, platform: &PlatformContext) -> Box<dyn ServiceManager> {
        match &self.root {
            Some(root) if !platform.is_systemd() => Box::new(
                InitScriptManager::for_platform(platform)
                    .with_dirs(root.join("etc").join("init.d"), root.join("etc")),
            ),
            _ => manager_for(platform),
        }
    }
}

pub fn load_configs(path: &Path) -> Result<Vec<DesiredLogConfig>> {
    config::load_at(path).with_context(|| format!("failed to load {}", path.display()))
}
