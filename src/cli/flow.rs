use anyhow::{Context, Result};
use clap::Args;

use super::context::CliContext;
use super::driver::DriverArgs;
use super::runtime::load_flow;

#[derive(Args, Clone, Debug)]
pub struct FlowArgs {
    #[command(flatten)]
    pub driver: DriverArgs,
}

pub fn cmd_flow(args: FlowArgs, ctx: &CliContext) -> Result<()> {
    let flow = load_flow(ctx.config(), &args.driver)?;
    let yaml = flow.to_yaml().context("Failed to render flow")?;
    print!("{yaml}");
    Ok(())
}
