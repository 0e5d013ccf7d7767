//! Core data types for interaction primitives

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::ActionError;

/// Prefix that marks a failed interaction in the text channel
pub const ERROR_MARKER: &str = "ERROR";

/// Prefix scripts use to report success; `SUCCESS: <value>` carries a payload
pub const SUCCESS_MARKER: &str = "SUCCESS";

/// Identifier for one open page/tab inside a driver
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to an element located inside a session
///
/// Handles are only meaningful to the driver that issued them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Session the element was found in
    pub session: SessionId,

    /// Driver-assigned element identifier
    pub id: Uuid,

    /// Selector the element was located with
    pub selector: String,
}

impl ElementHandle {
    pub fn new(session: SessionId, selector: impl Into<String>) -> Self {
        Self {
            session,
            id: Uuid::new_v4(),
            selector: selector.into(),
        }
    }
}

/// Render a failure cause in the uniform text channel
pub fn error_text(cause: impl fmt::Display) -> String {
    format!("{ERROR_MARKER}: {cause}")
}

/// Fold a primitive result into the uniform text channel
pub fn into_text(result: Result<String, ActionError>) -> String {
    match result {
        Ok(text) => text,
        Err(err) => error_text(err),
    }
}

/// Whether a text-channel value reports a failure
pub fn is_error_text(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_MARKER)
}

/// Whether a text-channel value carries the success marker
pub fn is_success_text(text: &str) -> bool {
    text.contains(SUCCESS_MARKER)
}

/// Only web and local file URLs can be opened
pub fn validate_url(url: &str) -> Result<(), ActionError> {
    let ok = !url.is_empty()
        && (url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://"));
    if ok {
        Ok(())
    } else {
        Err(ActionError::Navigation(format!("unsupported url '{url}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_channel_round_trip() {
        assert_eq!(into_text(Ok("SUCCESS".into())), "SUCCESS");
        let text = into_text(Err(ActionError::Script("boom".into())));
        assert_eq!(text, "ERROR: JavaScript execution error: boom");
        assert!(is_error_text(&text));
        assert!(!is_success_text(&text));
    }

    #[test]
    fn bare_error_marker_counts_as_error() {
        assert!(is_error_text("ERROR"));
        assert!(is_error_text("  ERROR: not found"));
        assert!(!is_error_text("SUCCESS: via ID"));
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("file:///path/to/file.html").is_ok());

        assert!(validate_url("").is_err());
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("ftp://example.com").is_err());
    }
}
