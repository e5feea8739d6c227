//! `varnishlog-converge plan`: resolved destinations, no side effects.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use varnishlog_converge::{select, FileSystemProbe, StdFsProbe};
use varnishlog_core::config::DEFAULT_CONFIG_PATH;
use varnishlog_core::{DesiredLogConfig, PlatformContext, TemplatePlan};

use super::{load_configs, FactsArgs};

/// Arguments for `varnishlog-converge plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Desired-state YAML file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(flatten)]
    pub facts: FactsArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    platform: PlatformContext,
    resources: Vec<ResourcePlan>,
}

#[derive(Debug, Serialize)]
struct ResourcePlan {
    name: String,
    service: String,
    plan: TemplatePlan,
    /// `None` when logrotate is disabled for the resource.
    logrotate: Option<PathBuf>,
    logrotate_dir_present: bool,
}

impl ResourcePlan {
    fn build(config: &DesiredLogConfig, platform: &PlatformContext, probe: &StdFsProbe) -> Self {
        ResourcePlan {
            name: config.name().to_owned(),
            service: config.log_format().service_name().to_owned(),
            plan: select(platform, config.log_format()),
            logrotate: config.logrotate().then(|| config.logrotate_destination()),
            logrotate_dir_present: probe.exists(config.logrotate_path()),
        }
    }
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let configs = load_configs(&self.config)?;
        let platform = self.facts.platform()?;
        let probe = match &self.facts.root {
            Some(root) => StdFsProbe::with_root(root),
            None => StdFsProbe::new(),
        };

        let report = PlanReport {
            resources: configs
                .iter()
                .map(|c| ResourcePlan::build(c, &platform, &probe))
                .collect(),
            platform,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &PlanReport) {
    println!(
        "platform: {} / {}",
        report.platform.platform_family.bold(),
        report.platform.init_system.bold()
    );
    for r in &report.resources {
        println!("{} ({})", r.name.bold(), r.service);
        println!(
            "  config     {}  [{}]",
            r.plan.destination_path.display(),
            r.plan.variant
        );
        match &r.logrotate {
            Some(path) if r.logrotate_dir_present => {
                println!("  logrotate  {}", path.display())
            }
            Some(path) => println!(
                "  logrotate  {}  {}",
                path.display(),
                "(directory missing, will be skipped)".dimmed()
            ),
            None => println!("  logrotate  {}", "disabled".dimmed()),
        }
    }
}
