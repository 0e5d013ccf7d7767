use std::path::PathBuf;
use std::sync::Arc;

use action_flow::FlowSpec;
use action_primitives::{ScriptFixture, ScriptedLauncher, SessionLauncher};
use anyhow::{Context, Result};
use cdp_adapter::ChromiumLauncher;
use rto_probe::{AppConfig, IsolationBoundary, RunSupervisor};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::context::CliContext;
use super::driver::{DriverArgs, DriverKind};
use super::env::LogFormat;

pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Human => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => AppConfig::default_path().context("Failed to get config directory")?,
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;

        let config = AppConfig::from_yaml_str(&content).context("Failed to parse config file")?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: AppConfig::default(),
            path: config_path,
        })
    }
}

pub fn build_launcher(config: &AppConfig, driver: &DriverArgs) -> Result<Arc<dyn SessionLauncher>> {
    match driver.driver {
        DriverKind::Chromium => Ok(Arc::new(ChromiumLauncher::new(config.cdp_config()))),
        DriverKind::Scripted => {
            let fixture = match &driver.fixture {
                Some(path) => ScriptFixture::load(path)
                    .with_context(|| format!("Failed to load fixture {}", path.display()))?,
                None => ScriptFixture::default(),
            };
            Ok(Arc::new(ScriptedLauncher::new(fixture)))
        }
    }
}

/// Effective flow: `--flow`, else `flow_file`, else the built-in recipe; pacing applied
pub fn load_flow(config: &AppConfig, driver: &DriverArgs) -> Result<Arc<FlowSpec>> {
    let flow = config
        .load_flow(driver.flow.as_deref())
        .context("Failed to load flow definition")?;
    flow.validate().context("Invalid flow definition")?;
    Ok(Arc::new(config.apply_pacing(flow, driver.no_pacing)))
}

/// Supervisor for this process; `workspace_root` overrides `run.workspace_root`
pub fn build_supervisor(
    ctx: &CliContext,
    driver: &DriverArgs,
    workspace_root: Option<PathBuf>,
) -> Result<RunSupervisor> {
    let config = ctx.config();
    let launcher = build_launcher(config, driver)?;
    let flow = load_flow(config, driver)?;
    let workspace_root = workspace_root.or_else(|| config.run.workspace_root.clone());
    Ok(RunSupervisor::new(launcher, flow).with_workspace_root(workspace_root))
}

/// Boundary that re-runs this binary's hidden `child` command with the same options
pub fn build_boundary(ctx: &CliContext, driver: &DriverArgs) -> Result<IsolationBoundary> {
    // fail fast on a broken flow instead of once per child
    load_flow(ctx.config(), driver)?;

    let run = &ctx.config().run;
    let mut leading_args = ctx.global_args().to_vec();
    leading_args.push("child".to_string());
    leading_args.extend(driver.to_args());

    let mut boundary = IsolationBoundary::current_exe()?
        .with_leading_args(leading_args)
        .with_grace_period(run.grace_period())
        .with_reap_timeout(run.reap_timeout());
    if let Some(dir) = &run.handoff_dir {
        boundary = boundary.with_handoff_dir(dir);
    }
    if let Some(dir) = &run.workspace_root {
        boundary = boundary.with_workspace_dir(dir);
    }
    Ok(boundary)
}
