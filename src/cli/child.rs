use std::path::PathBuf;
use std::process::ExitCode;

use action_flow::FlowResult;
use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use rto_probe::{run_child, write_handoff, RunRequest};
use tracing::error;

use super::context::CliContext;
use super::driver::DriverArgs;
use super::runtime::build_supervisor;

#[derive(Args, Clone, Debug)]
pub struct ChildArgs {
    /// Where the result is written
    #[arg(long, value_name = "FILE")]
    pub handoff: PathBuf,

    /// Directory that holds this run's browser profile; owned by the parent
    #[arg(long, value_name = "DIR")]
    pub workspace_root: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    pub reg_no: String,

    #[arg(long, allow_hyphen_values = true)]
    pub chassis_no: String,

    #[arg(long, allow_hyphen_values = true)]
    pub rto_value: String,

    #[arg(long, action = ArgAction::Set)]
    pub headless: bool,

    #[arg(long)]
    pub timeout_sec: u64,

    #[command(flatten)]
    pub driver: DriverArgs,
}

pub async fn cmd_child(args: ChildArgs, ctx: &CliContext) -> Result<ExitCode> {
    let request = RunRequest::new(args.reg_no, args.chassis_no)
        .with_rto_value(args.rto_value)
        .with_headless(args.headless)
        .with_timeout_sec(args.timeout_sec);

    let supervisor = match build_supervisor(ctx, &args.driver, args.workspace_root.clone()) {
        Ok(supervisor) => supervisor,
        Err(err) => {
            error!("child setup failed: {:#}", err);
            write_handoff(
                &args.handoff,
                &FlowResult::failure([format!("child_error: {err:#}")]),
            )
            .context("Failed to write handoff")?;
            return Ok(ExitCode::FAILURE);
        }
    };

    run_child(&supervisor, &request, &args.handoff)
        .await
        .context("Failed to write handoff")?;
    Ok(ExitCode::SUCCESS)
}
