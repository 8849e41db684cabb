//! CLI command implementations.

pub mod config;
pub mod inspect;
pub mod warm;

use clap::{Args, Subcommand};
use prefetch_engine::PrefetchKind;

/// Arguments for the warm command.
#[derive(Args)]
pub struct WarmArgs {
    /// Route paths or links to prefetch.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Fetch as user-triggered requests, bypassing the request pool.
    #[arg(short, long)]
    pub priority: bool,

    /// What to prefetch: data, template or all.
    #[arg(short = 't', long = "type", default_value = "data")]
    pub kind: PrefetchKind,
}

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Route path or link to resolve.
    pub path: String,

    /// Also hydrate and print the route's shared data.
    #[arg(short, long)]
    pub data: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Check the configuration for settings that have no effect
    Validate,
}
