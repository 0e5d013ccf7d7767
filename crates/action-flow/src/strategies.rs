//! Outcome classification strategies

use action_primitives::{is_error_text, is_success_text, SUCCESS_MARKER};
use tracing::warn;

use crate::outcome::StepOutcome;
use crate::types::{FailureStrategy, StepSpec};

/// Turns the text produced by a step into a classified outcome
pub trait FailureHandler: Send + Sync {
    fn classify(&self, step: &StepSpec, text: String) -> StepOutcome;
}

/// Default classification rules
///
/// - extraction steps are ok only when `SUCCESS:` is followed by a non-empty value
/// - error-marker texts are soft for `continue` steps and fatal for `abort` steps
/// - `abort` steps must also report the success marker
pub struct DefaultFailureHandler;

impl DefaultFailureHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultFailureHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureHandler for DefaultFailureHandler {
    fn classify(&self, step: &StepSpec, text: String) -> StepOutcome {
        if step.extracts {
            return match extract_value(&text) {
                Some(value) => StepOutcome::ok(&step.name, text).with_value(value),
                None => {
                    warn!(step = %step.name, text = %text, "extraction produced no value");
                    StepOutcome::fatal(&step.name, text)
                }
            };
        }

        let failed = is_error_text(&text)
            || (step.on_error == FailureStrategy::Abort && !is_success_text(&text));
        if !failed {
            return StepOutcome::ok(&step.name, text);
        }

        match step.on_error {
            FailureStrategy::Abort => {
                warn!(step = %step.name, text = %text, "step failed, aborting flow");
                StepOutcome::fatal(&step.name, text)
            }
            FailureStrategy::Continue => {
                warn!(step = %step.name, text = %text, "step failed, continuing to next step");
                StepOutcome::soft(&step.name, text)
            }
        }
    }
}

/// Everything after the first `SUCCESS:` marker, trimmed; `None` when absent or empty
pub fn extract_value(text: &str) -> Option<String> {
    let marker = format!("{SUCCESS_MARKER}:");
    let (_, rest) = text.split_once(marker.as_str())?;
    let value = rest.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
