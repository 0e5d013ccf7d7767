use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use rto_probe::{FlowRunner, RunRequest};

use super::context::CliContext;
use super::driver::DriverArgs;
use super::runtime::{build_boundary, build_supervisor};

/// Exit code of a run that completed without a result
const FAILED_RUN_EXIT: u8 = 2;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Vehicle registration number
    #[arg(long, allow_hyphen_values = true)]
    pub reg_no: String,

    /// Chassis number
    #[arg(long, allow_hyphen_values = true)]
    pub chassis_no: String,

    /// Target RTO office code
    #[arg(
        long,
        allow_hyphen_values = true,
        default_value = rto_probe::request::DEFAULT_RTO_VALUE
    )]
    pub rto_value: String,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Wall-clock budget in seconds (config default when unset)
    #[arg(long)]
    pub timeout_sec: Option<u64>,

    /// Run in this process instead of an isolated child
    #[arg(long)]
    pub in_process: bool,

    #[command(flatten)]
    pub driver: DriverArgs,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<ExitCode> {
    let defaults = ctx.config().request_defaults();
    let request = RunRequest::new(args.reg_no.trim(), args.chassis_no.trim())
        .with_rto_value(args.rto_value.trim())
        .with_headless(!args.headful && defaults.headless)
        .with_timeout_sec(args.timeout_sec.unwrap_or(defaults.timeout_sec));

    let runner: Box<dyn FlowRunner> = if args.in_process {
        Box::new(build_supervisor(ctx, &args.driver, None)?)
    } else {
        Box::new(build_boundary(ctx, &args.driver)?)
    };
    let result = runner.execute(&request).await;

    let rendered = serde_json::to_string_pretty(&result).context("Failed to render result")?;
    println!("{rendered}");

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(FAILED_RUN_EXIT)
    })
}
