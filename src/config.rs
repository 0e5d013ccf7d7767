//! Application configuration
//!
//! Loaded from YAML (`--config` or `<config_dir>/rto-probe/config.yaml`); every
//! section and field is optional.

use action_flow::FlowSpec;
use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::RunError;
use crate::isolation::{DEFAULT_GRACE_PERIOD, DEFAULT_REAP_TIMEOUT};
use crate::recipe;
use crate::request::{RequestDefaults, DEFAULT_TIMEOUT_SEC};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub run: RunConfig,
    pub pacing: PacingConfig,
    pub browser: BrowserSection,
    /// Flow definition replacing the built-in recipe
    pub flow_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub default_timeout_sec: u64,
    pub grace_period_sec: u64,
    pub reap_timeout_sec: u64,
    /// Where handoff artifacts are written (system temp dir when unset)
    pub handoff_dir: Option<PathBuf>,
    /// Where profile workspaces are created (system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            default_timeout_sec: DEFAULT_TIMEOUT_SEC,
            grace_period_sec: DEFAULT_GRACE_PERIOD.as_secs(),
            reap_timeout_sec: DEFAULT_REAP_TIMEOUT.as_secs(),
            handoff_dir: None,
            workspace_root: None,
        }
    }
}

impl RunConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_sec)
    }

    pub fn reap_timeout(&self) -> Duration {
        Duration::from_secs(self.reap_timeout_sec)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub enabled: bool,
    pub scale: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scale: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub executable: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub disable_sandbox: Option<bool>,
}

impl AppConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, RunError> {
        serde_yaml::from_str(raw).map_err(|err| RunError::Config(err.to_string()))
    }

    /// `<config_dir>/rto-probe/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rto-probe").join("config.yaml"))
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            timeout_sec: self.run.default_timeout_sec,
            headless: self.cdp_config().headless,
            ..RequestDefaults::default()
        }
    }

    /// Chromium settings: environment defaults overlaid with this file's browser section
    pub fn cdp_config(&self) -> CdpConfig {
        let mut cfg = CdpConfig::default()
            .with_executable(self.browser.executable.clone())
            .with_extra_args(self.browser.extra_args.clone());
        if let Some(disable) = self.browser.disable_sandbox {
            cfg.disable_sandbox = disable;
        }
        cfg
    }

    /// Flow from `override_path`, else `flow_file`, else the built-in recipe
    pub fn load_flow(&self, override_path: Option<&Path>) -> Result<FlowSpec, RunError> {
        match override_path.or(self.flow_file.as_deref()) {
            Some(path) => Ok(FlowSpec::load(path)?),
            None => Ok(recipe::vahan_mobile_lookup()),
        }
    }

    /// Apply the pacing section (and an explicit opt-out) to `flow`
    pub fn apply_pacing(&self, flow: FlowSpec, disabled: bool) -> FlowSpec {
        if disabled || !self.pacing.enabled {
            flow.without_pacing()
        } else if (self.pacing.scale - 1.0).abs() > f64::EPSILON {
            flow.scale_pacing(self.pacing.scale)
        } else {
            flow
        }
    }
}
