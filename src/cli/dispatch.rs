use std::process::ExitCode;

use anyhow::Result;

use super::child::cmd_child;
use super::env::CliArgs;
use super::flow::cmd_flow;
use super::run::cmd_run;
use super::serve::cmd_serve;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<ExitCode> {
    match cli.command.clone() {
        Commands::Serve(args) => cmd_serve(args, ctx).await.map(|()| ExitCode::SUCCESS),
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Child(args) => cmd_child(args, ctx).await,
        Commands::Flow(args) => cmd_flow(args, ctx).map(|()| ExitCode::SUCCESS),
    }
}
