//! Flow error types

use thiserror::Error;

/// Errors raised while loading or preparing a flow
///
/// Step failures are never errors: they are recorded as outcomes in the journal.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Flow validation failed
    #[error("Flow validation failed: {0}")]
    ValidationFailed(String),

    /// Flow definition could not be parsed
    #[error("Invalid flow definition: {0}")]
    InvalidDefinition(String),

    /// Flow file could not be read
    #[error("Failed to read flow file {path}: {reason}")]
    Io { path: String, reason: String },

    /// Action primitive error
    #[error("Action primitive error: {0}")]
    ActionError(String),
}

impl From<action_primitives::ActionError> for FlowError {
    fn from(err: action_primitives::ActionError) -> Self {
        FlowError::ActionError(err.to_string())
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(err: serde_yaml::Error) -> Self {
        FlowError::InvalidDefinition(err.to_string())
    }
}
