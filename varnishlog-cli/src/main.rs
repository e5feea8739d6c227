//! varnishlog-converge: keep varnishlog/varnishncsa configured and running.
//!
//! # Usage
//!
//! ```text
//! varnishlog-converge apply  [--config PATH] [--dry-run] [--root DIR] [--templates DIR]
//!                            [--platform-family F] [--init-system I] [--varnish-version V] [--json]
//! varnishlog-converge plan   [--config PATH] [--root DIR] [--platform-family F] [--init-system I] [--json]
//! varnishlog-converge detect [--root DIR] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{apply::ApplyArgs, detect::DetectArgs, plan::PlanArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "varnishlog-converge",
    version,
    about = "Converge varnishlog/varnishncsa configuration and service state",
    long_about = None,
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render configuration and bring the logging services up.
    Apply(ApplyArgs),

    /// Show where each resource's files would go; changes nothing.
    Plan(PlanArgs),

    /// Print the platform facts this host reports.
    Detect(DetectArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Apply(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Detect(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
