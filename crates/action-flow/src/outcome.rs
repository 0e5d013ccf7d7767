//! Step outcomes, the shared journal and the flow result record

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tri-state classification of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Ok,
    SoftError,
    FatalError,
}

/// Result of one step invocation; never mutated once recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub text: String,
    pub kind: OutcomeKind,

    /// Value produced by an extraction step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl StepOutcome {
    pub fn new(step: impl Into<String>, text: impl Into<String>, kind: OutcomeKind) -> Self {
        Self {
            step: step.into(),
            text: text.into(),
            kind,
            value: None,
        }
    }

    pub fn ok(step: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(step, text, OutcomeKind::Ok)
    }

    pub fn soft(step: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(step, text, OutcomeKind::SoftError)
    }

    pub fn fatal(step: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(step, text, OutcomeKind::FatalError)
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == OutcomeKind::FatalError
    }

    /// Log line form: `<step>: <text>`
    pub fn render(&self) -> String {
        format!("{}: {}", self.step, self.text)
    }
}

/// `details` section of a [`FlowResult`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDetails {
    /// Ordered, human-readable log
    pub messages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepOutcome>,
}

/// The record handed back by a run, serialized verbatim across the process boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResult {
    pub success: bool,

    #[serde(rename = "mobile_number", default)]
    pub extracted: Option<String>,

    #[serde(default)]
    pub details: FlowDetails,
}

impl FlowResult {
    /// Synthesized failure carrying only log messages
    pub fn failure<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            success: false,
            extracted: None,
            details: FlowDetails {
                messages: messages.into_iter().map(Into::into).collect(),
                steps: Vec::new(),
            },
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.details.messages
    }

    /// Check the success/extraction invariants
    ///
    /// `success` requires a non-empty extracted value, and an extracted value must have
    /// been produced by an ok step outcome.
    pub fn is_consistent(&self) -> bool {
        if self.success && self.extracted.as_deref().map_or(true, str::is_empty) {
            return false;
        }
        match &self.extracted {
            None => true,
            Some(value) => self.details.steps.iter().any(|outcome| {
                outcome.kind == OutcomeKind::Ok && outcome.value.as_deref() == Some(value.as_str())
            }),
        }
    }
}

#[derive(Debug, Default)]
struct JournalInner {
    messages: Vec<String>,
    outcomes: Vec<StepOutcome>,
}

/// Append-only run log shared between the controller and its supervisor
#[derive(Clone, Debug, Default)]
pub struct FlowJournal {
    inner: Arc<Mutex<JournalInner>>,
}

impl FlowJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step outcome and its rendered log line
    pub fn record(&self, outcome: StepOutcome) {
        let mut inner = self.inner.lock();
        inner.messages.push(outcome.render());
        inner.outcomes.push(outcome);
    }

    /// Append a log line that is not a step outcome
    pub fn note(&self, message: impl Into<String>) {
        self.inner.lock().messages.push(message.into());
    }

    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of the most recent ok outcome that carries one
    pub fn extracted(&self) -> Option<String> {
        self.inner
            .lock()
            .outcomes
            .iter()
            .rev()
            .find(|o| o.kind == OutcomeKind::Ok)
            .and_then(|o| o.value.clone())
    }

    pub fn details(&self) -> FlowDetails {
        let inner = self.inner.lock();
        FlowDetails {
            messages: inner.messages.clone(),
            steps: inner.outcomes.clone(),
        }
    }

    /// Failed result carrying the current log
    pub fn failed_result(&self) -> FlowResult {
        FlowResult {
            success: false,
            extracted: None,
            details: self.details(),
        }
    }

    /// Successful result carrying the current log and `value`
    pub fn success_result(&self, value: String) -> FlowResult {
        FlowResult {
            success: true,
            extracted: Some(value),
            details: self.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_renders_log_lines() {
        let journal = FlowJournal::new();
        journal.record(StepOutcome::soft("Close modal", "ERROR: .btn-close not found"));
        journal.record(StepOutcome::ok("Get mobile", "SUCCESS: 9876543210").with_value("9876543210"));
        journal.note("Flow: ERROR: timed out after 5s");

        let details = journal.details();
        assert_eq!(
            details.messages,
            vec![
                "Close modal: ERROR: .btn-close not found",
                "Get mobile: SUCCESS: 9876543210",
                "Flow: ERROR: timed out after 5s",
            ]
        );
        assert_eq!(details.steps.len(), 2);
        assert_eq!(journal.extracted().as_deref(), Some("9876543210"));
    }

    #[test]
    fn notes_count_towards_length() {
        let journal = FlowJournal::new();
        assert!(journal.is_empty());
        journal.note("launch_error: no browser");
        assert!(!journal.is_empty());
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.details().steps.len(), 0);
        assert_eq!(journal.extracted(), None);
    }

    #[test]
    fn outbound_shape() {
        let journal = FlowJournal::new();
        journal.record(StepOutcome::ok("Get mobile", "SUCCESS: 42").with_value("42"));
        let result = journal.success_result("42".into());
        assert!(result.is_consistent());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["mobile_number"], "42");
        assert_eq!(json["details"]["messages"][0], "Get mobile: SUCCESS: 42");

        let failure = serde_json::to_value(FlowResult::failure(["child_timeout"])).unwrap();
        assert_eq!(
            failure,
            serde_json::json!({
                "success": false,
                "mobile_number": null,
                "details": {"messages": ["child_timeout"]}
            })
        );
    }

    #[test]
    fn inconsistent_results_are_detected() {
        let mut result = FlowResult::failure(Vec::<String>::new());
        assert!(result.is_consistent());
        result.success = true;
        assert!(!result.is_consistent());
        result.extracted = Some("123".into());
        assert!(!result.is_consistent());
        result.details.steps.push(StepOutcome::ok("Get", "SUCCESS: 123").with_value("123"));
        assert!(result.is_consistent());
    }
}
