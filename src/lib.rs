//! rto-probe: a supervised, process-isolated browser flow runner
//!
//! Exposes modules for integration testing

pub mod config;
pub mod errors;
pub mod isolation;
pub mod recipe;
pub mod request;
pub mod server;
pub mod supervisor;
pub mod workspace;

pub use config::AppConfig;
pub use errors::RunError;
pub use isolation::{read_handoff, run_child, write_handoff, IsolationBoundary};
pub use request::{RawRunRequest, RequestDefaults, RequestError, RunRequest};
pub use supervisor::{FlowRunner, RunSupervisor};
pub use workspace::ScopedWorkspace;
