use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::env::{CliArgs, Command};
use super::runtime::init_logging;
use super::{cmd_check, cmd_run};
use crate::config::load_config;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;

    info!("Starting sitewatch v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Command::Run(args) => cmd_run(args, config).await,
        Command::Check(args) => cmd_check(args, config).await,
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
