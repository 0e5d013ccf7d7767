//! Launch configuration and Chrome executable detection.

use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};
use which::which;

/// Configuration for launching one isolated Chromium.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CdpConfig {
    /// Explicit browser binary; detected when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Default rendering mode when a run does not say otherwise.
    #[serde(default = "resolve_headless_default")]
    pub headless: bool,
    #[serde(default = "CdpConfig::default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,
    #[serde(default = "CdpConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "resolve_disable_sandbox")]
    pub disable_sandbox: bool,
    /// Appended after the built-in launch arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            executable: env_executable(),
            headless: resolve_headless_default(),
            launch_timeout_ms: Self::default_launch_timeout_ms(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            disable_sandbox: resolve_disable_sandbox(),
            extra_args: Vec::new(),
        }
    }
}

impl CdpConfig {
    fn default_launch_timeout_ms() -> u64 {
        20_000
    }

    fn default_request_timeout_ms() -> u64 {
        30_000
    }

    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        if executable.is_some() {
            self.executable = executable;
        }
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    /// Configured binary if it exists, otherwise whatever detection finds.
    pub fn resolve_executable(&self) -> Option<PathBuf> {
        match &self.executable {
            Some(path) if path.exists() => Some(path.clone()),
            _ => detect_chrome_executable(),
        }
    }
}

fn resolve_headless_default() -> bool {
    // "0", "false", "no", "off" means headful
    match env::var("RTO_PROBE_HEADLESS") {
        Ok(value) => {
            let lower = value.trim().to_ascii_lowercase();
            !matches!(lower.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

fn resolve_disable_sandbox() -> bool {
    env::var("RTO_PROBE_DISABLE_SANDBOX")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn env_executable() -> Option<PathBuf> {
    env::var("RTO_PROBE_CHROME")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

/// Arguments every run passes to Chromium, besides `--user-data-dir`.
pub fn launch_args(headless: bool, extra: &[String]) -> Vec<String> {
    let mut args = vec!["--incognito".to_string()];
    args.extend(stealth::masking_args());
    args.extend(
        [
            "--disable-background-networking",
            "--disable-breakpad",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-sync",
            "--password-store=basic",
            "--use-mock-keychain",
        ]
        .iter()
        .map(|arg| arg.to_string()),
    );
    if headless {
        args.push("--hide-scrollbars".to_string());
        args.push("--mute-audio".to_string());
    }
    args.extend(extra.iter().cloned());
    args
}

/// Locate a Chrome/Chromium binary: `RTO_PROBE_CHROME`, then `PATH`, then OS defaults.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Some(candidate) = env_executable() {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("RTO_PROBE_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);

    if !skip_defaults {
        for candidate in os_specific_chrome_paths() {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "freebsd")))]
    {
        Vec::new()
    }
}
