//! Chromium driver for the interaction primitives.
//!
//! [`ChromiumLauncher`] starts one isolated Chromium per run, bound to the run's profile
//! workspace, and hands back a [`ChromiumPrimitives`] that maps pages to sessions and
//! located elements to handles.

mod adapter;
pub mod config;

pub use adapter::{ChromiumLauncher, ChromiumPrimitives};
pub use config::{detect_chrome_executable, launch_args, CdpConfig};
