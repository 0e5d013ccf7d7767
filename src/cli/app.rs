use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, LoadedConfig};

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_format)?;
    debug!("Starting rto-probe v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let ctx = CliContext::new(config, path, &cli);

    match dispatch(&cli, &ctx).await {
        Ok(code) => Ok(code),
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
