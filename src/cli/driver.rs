use std::path::PathBuf;

use clap::{Args, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DriverKind {
    /// Real Chromium over CDP
    Chromium,
    /// In-memory driver answering from a fixture
    Scripted,
}

impl DriverKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverKind::Chromium => "chromium",
            DriverKind::Scripted => "scripted",
        }
    }
}

/// Driver and flow selection, forwarded unchanged to child processes
#[derive(Args, Clone, Debug)]
pub struct DriverArgs {
    /// Interaction driver
    #[arg(long, value_enum, default_value_t = DriverKind::Chromium)]
    pub driver: DriverKind,

    /// Fixture for the scripted driver (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Flow definition replacing the built-in recipe
    #[arg(long, value_name = "FILE")]
    pub flow: Option<PathBuf>,

    /// Disable all randomized delays
    #[arg(long)]
    pub no_pacing: bool,
}

impl DriverArgs {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--driver".to_string(), self.driver.as_str().to_string()];
        if let Some(fixture) = &self.fixture {
            args.push("--fixture".to_string());
            args.push(fixture.display().to_string());
        }
        if let Some(flow) = &self.flow {
            args.push("--flow".to_string());
            args.push(flow.display().to_string());
        }
        if self.no_pacing {
            args.push("--no-pacing".to_string());
        }
        args
    }
}
