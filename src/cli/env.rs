use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::{CheckArgs, RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "sitewatch",
    version,
    about = "Synthetic monitoring probe for JS-heavy storefronts"
)]
pub struct CliArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Visit every URL in a source file and write report artifacts
    Run(RunArgs),
    /// One-shot health check of a single URL, no artifacts
    Check(CheckArgs),
}
