//! Prefetch CLI - Warm and inspect a statically generated site's route data.
//!
//! Commands:
//! - `prefetch warm` - Prefetch routes and report what was cached
//! - `prefetch inspect` - Resolve a single route and show its metadata
//! - `prefetch config` - Show the effective configuration

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use commands::{ConfigArgs, InspectArgs, WarmArgs};

/// Prefetch CLI - Warm and inspect route prefetch caches
#[derive(Parser)]
#[command(name = "prefetch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Site URL that relative request paths are resolved against
    #[arg(short, long, global = true, env = "PREFETCH_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prefetch routes and report the resulting cache state
    Warm(WarmArgs),

    /// Resolve one route and show its metadata
    Inspect(InspectArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Log to stderr so stdout stays clean for command output.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = output::Output::new(cli.verbose, cli.json);

    let ctx = match context::Context::load(cli.config.as_deref(), cli.base_url, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Warm(args) => commands::warm::run(args, &ctx).await,
        Commands::Inspect(args) => commands::inspect::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
