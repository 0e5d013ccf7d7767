//! Error types for interaction primitives

use thiserror::Error;

/// Failures surfaced by an interaction driver
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The URL was rejected or the page could not be loaded
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Navigation or a protocol round-trip exceeded its deadline
    #[error("navigation timeout: {0}")]
    NavTimeout(String),

    /// Script threw or its result could not be read
    #[error("JavaScript execution error: {0}")]
    Script(String),

    /// Element lookup itself failed (as opposed to matching nothing)
    #[error("element lookup failed: {0}")]
    Lookup(String),

    /// Element exists but the click could not be dispatched
    #[error("element not clickable: {0}")]
    NotClickable(String),

    /// Session was never opened or has already been closed
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Element handle does not belong to a live session
    #[error("unknown element: {0}")]
    UnknownElement(String),

    /// Browser process could not be started
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Fixture or driver configuration could not be loaded
    #[error("driver configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}
