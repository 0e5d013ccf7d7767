//! Error types for the run supervisor and isolation boundary
//!
//! These never reach a caller of [`crate::RunSupervisor::run`] or
//! [`crate::IsolationBoundary::run`]: both fold failures into a `FlowResult`.

use action_flow::FlowError;
use action_primitives::ActionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// Profile workspace could not be created or removed
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Handoff artifact could not be written or read
    #[error("handoff I/O error at {path}: {reason}")]
    HandoffIo { path: String, reason: String },

    /// Handoff artifact is not a valid result record
    #[error("handoff decode error: {0}")]
    HandoffDecode(String),

    /// Handoff result breaks the success/extraction invariants
    #[error("handoff result is inconsistent: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("driver error: {0}")]
    Driver(#[from] ActionError),

    #[error("configuration error: {0}")]
    Config(String),
}
