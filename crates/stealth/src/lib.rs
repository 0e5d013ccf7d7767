//! Stealth helpers for the interaction layer.
//!
//! Two concerns live here: the randomized inter-step pacing that lets asynchronous page
//! updates settle (and keeps the interaction rhythm human-like), and the browser launch
//! arguments that hide the most obvious automation fingerprints.

pub mod pacing;

pub use pacing::PacingPolicy;

/// Launch arguments that mask the automation-controlled fingerprint.
pub fn masking_args() -> Vec<String> {
    vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ]
}
