use std::path::{Path, PathBuf};

use rto_probe::AppConfig;

use super::env::CliArgs;

pub struct CliContext {
    config: AppConfig,
    config_path: PathBuf,
    global_args: Vec<String>,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf, cli: &CliArgs) -> Self {
        let mut global_args = Vec::new();
        if config_path.exists() {
            global_args.push("--config".to_string());
            global_args.push(config_path.display().to_string());
        }
        global_args.push("--log-level".to_string());
        global_args.push(cli.log_level.clone());
        if cli.debug {
            global_args.push("--debug".to_string());
        }
        global_args.push("--log-format".to_string());
        global_args.push(cli.log_format.as_str().to_string());

        Self {
            config,
            config_path,
            global_args,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Global options a child process must be started with
    pub fn global_args(&self) -> &[String] {
        &self.global_args
    }
}
