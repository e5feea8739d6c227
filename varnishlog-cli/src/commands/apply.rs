//! `varnishlog-converge apply`: converge every resource in the config file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use varnishlog_converge::{
    ApplyResult, ConvergenceEngine, DiskRenderer, LogrotateOutcome, ServiceAction, StdFsProbe,
};
use varnishlog_core::config::DEFAULT_CONFIG_PATH;
use varnishlog_detector::varnish_version;
use varnishlog_renderer::TemplateEngine;
use varnishlog_service::GuardedServiceManager;

use super::{load_configs, FactsArgs};

/// Arguments for `varnishlog-converge apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Desired-state YAML file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(flatten)]
    pub facts: FactsArgs,

    /// Report what would change without writing files or touching services.
    #[arg(long)]
    pub dry_run: bool,

    /// Version string handed to the templates (default: `varnishd -V`).
    #[arg(long, value_name = "VERSION")]
    pub varnish_version: Option<String>,

    /// Directory of `.tera` files overriding the built-in templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let configs = load_configs(&self.config)?;
        let platform = self.facts.platform()?;
        let version = match self.varnish_version.clone() {
            Some(version) => version,
            None => varnish_version()
                .context("could not determine the varnish version; pass --varnish-version")?,
        };

        let templates =
            TemplateEngine::new(self.templates.as_deref()).context("failed to load templates")?;
        let mut renderer = DiskRenderer::new(templates).dry_run(self.dry_run);
        let probe = match &self.facts.root {
            Some(root) => {
                renderer = renderer.with_root(root).without_ownership();
                StdFsProbe::with_root(root)
            }
            None => StdFsProbe::new(),
        };
        let services = GuardedServiceManager::new(self.facts.service_manager(&platform));
        let engine = ConvergenceEngine::new(renderer, probe, services, version);

        let mut results = Vec::with_capacity(configs.len());
        for config in &configs {
            let result = engine
                .apply(config, &platform)
                .with_context(|| format!("failed to converge '{}'", config.name()))?;
            if !self.json {
                print_result(&result);
            }
            results.push(result);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else if results.is_empty() {
            println!("No resources declared in {}.", self.config.display());
        }
        Ok(())
    }
}

fn print_result(result: &ApplyResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };
    let headline = if result.changed() {
        format!("✓ '{}' ({}) converged", result.name, result.service).green()
    } else {
        format!("✓ '{}' ({}) unchanged", result.name, result.service).normal()
    };
    println!("{prefix}{headline}");

    for file in &result.files {
        let marker = match (file.changed, result.dry_run) {
            (true, true) => "~",
            (true, false) => "✎",
            (false, _) => "·",
        };
        println!("  {marker}  {}  [{}]", file.path.display(), file.variant);
    }
    match &result.logrotate {
        LogrotateOutcome::Applied { .. } => {}
        LogrotateOutcome::SkippedDisabled => println!("  -  logrotate disabled"),
        LogrotateOutcome::SkippedMissingDir { dir } => {
            println!("  -  logrotate skipped: {} does not exist", dir.display())
        }
    }
    for action in &result.actions {
        let verb = match action {
            ServiceAction::Enable => "enable",
            ServiceAction::Start => "start",
            ServiceAction::Restart => "restart",
        };
        println!("  ▶  {verb} {}", result.service.as_str().yellow());
    }
}
