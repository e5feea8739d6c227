//! `varnishlog-converge detect`: platform facts as seen by `apply`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use varnishlog_detector::varnish_version;

use super::FactsArgs;

/// Arguments for `varnishlog-converge detect`.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Inspect the tree under DIR instead of `/`.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Facts {
    platform_family: String,
    init_system: String,
    varnish_version: Option<String>,
}

impl DetectArgs {
    pub fn run(self) -> Result<()> {
        let platform = FactsArgs {
            root: self.root.clone(),
            ..FactsArgs::default()
        }
        .platform()?;
        let version = match varnish_version() {
            Ok(version) => Some(version),
            Err(err) => {
                tracing::info!(error = %err, "varnish version unavailable");
                None
            }
        };
        let facts = Facts {
            platform_family: platform.platform_family,
            init_system: platform.init_system,
            varnish_version: version,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&facts)?);
            return Ok(());
        }
        println!("platform_family: {}", facts.platform_family);
        println!("init_system:     {}", facts.init_system);
        println!(
            "varnish_version: {}",
            facts.varnish_version.as_deref().unwrap_or("not installed")
        );
        Ok(())
    }
}
