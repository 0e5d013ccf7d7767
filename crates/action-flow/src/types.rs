//! Core types for flow orchestration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use stealth::PacingPolicy;

use crate::errors::FlowError;

/// Clears local/session storage and non-HttpOnly cookies of the current page
pub const DEFAULT_STORAGE_CLEAR_SCRIPT: &str = r#"(function(){
    try {
        if (window.localStorage) localStorage.clear();
        if (window.sessionStorage) sessionStorage.clear();
        document.cookie.split(';').forEach(function(c) {
            var d = c.indexOf('=') > -1 ? c.substring(0, c.indexOf('=')) : c;
            document.cookie = d.trim() + '=;expires=Thu, 01 Jan 1970 00:00:00 GMT;path=/';
        });
        return 'SUCCESS: storage cleared';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

/// Flow state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Init,
    Navigated,
    ModalHandled,
    TargetSelected,
    ConsentChecked,
    ProceedClicked,
    MenuOpened,
    FormFilled,
    Validated,
    Extracted,
    Done,
    Failed,
    TimedOut,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Init => "init",
            FlowState::Navigated => "navigated",
            FlowState::ModalHandled => "modal_handled",
            FlowState::TargetSelected => "target_selected",
            FlowState::ConsentChecked => "consent_checked",
            FlowState::ProceedClicked => "proceed_clicked",
            FlowState::MenuOpened => "menu_opened",
            FlowState::FormFilled => "form_filled",
            FlowState::Validated => "validated",
            FlowState::Extracted => "extracted",
            FlowState::Done => "done",
            FlowState::Failed => "failed",
            FlowState::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// What a step does against the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Evaluate a script template and use its text as the outcome
    RunScript { script: String },

    /// Click the first element matching `selector`; absence is an error text
    ClickIfPresent { selector: String },

    /// Run `probe`; on success run `then`, otherwise `otherwise` (or keep the probe text)
    ConditionalScript {
        probe: String,
        then: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<String>,
    },
}

impl StepAction {
    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::RunScript { .. } => "run_script",
            StepAction::ClickIfPresent { .. } => "click_if_present",
            StepAction::ConditionalScript { .. } => "conditional_script",
        }
    }
}

/// Failure strategy - how an error outcome affects the flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Error outcomes are fatal and abort the flow
    Abort,

    /// Error outcomes are logged and the flow continues
    #[default]
    Continue,
}

/// One declarative step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Name used in the log line (`<name>: <text>`)
    pub name: String,

    /// State entered once this step completes without a fatal outcome
    pub state: FlowState,

    pub action: StepAction,

    #[serde(default)]
    pub on_error: FailureStrategy,

    /// Marks the step whose `SUCCESS: <value>` text carries the extracted value
    #[serde(default, skip_serializing_if = "is_false")]
    pub extracts: bool,

    /// Pacing applied after this step instead of the flow default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<PacingPolicy>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StepSpec {
    pub fn new(name: impl Into<String>, state: FlowState, action: StepAction) -> Self {
        Self {
            name: name.into(),
            state,
            action,
            on_error: FailureStrategy::Continue,
            extracts: false,
            pause: None,
        }
    }

    pub fn script(name: impl Into<String>, state: FlowState, script: impl Into<String>) -> Self {
        Self::new(
            name,
            state,
            StepAction::RunScript {
                script: script.into(),
            },
        )
    }

    pub fn click_if_present(
        name: impl Into<String>,
        state: FlowState,
        selector: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            state,
            StepAction::ClickIfPresent {
                selector: selector.into(),
            },
        )
    }

    pub fn conditional(
        name: impl Into<String>,
        state: FlowState,
        probe: impl Into<String>,
        then: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            state,
            StepAction::ConditionalScript {
                probe: probe.into(),
                then: then.into(),
                otherwise: None,
            },
        )
    }

    /// Make error outcomes of this step fatal
    pub fn fatal(mut self) -> Self {
        self.on_error = FailureStrategy::Abort;
        self
    }

    /// Mark this step as the extraction step (implies fatal)
    pub fn extracting(mut self) -> Self {
        self.extracts = true;
        self.on_error = FailureStrategy::Abort;
        self
    }

    pub fn with_pause(mut self, pause: PacingPolicy) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn is_fatal_on_error(&self) -> bool {
        self.on_error == FailureStrategy::Abort
    }
}

fn default_teardown_pause() -> PacingPolicy {
    PacingPolicy::between_ms(500, 1_000)
}

/// Flow definition - an entry URL plus an ordered list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSpec {
    pub id: String,

    pub name: String,

    pub entry_url: String,

    pub steps: Vec<StepSpec>,

    /// Default pacing after each step
    #[serde(default)]
    pub pause: PacingPolicy,

    /// Pacing after navigation, before the first storage clear (defaults to `pause`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_pause: Option<PacingPolicy>,

    /// Pacing before the exit storage clear
    #[serde(default = "default_teardown_pause")]
    pub teardown_pause: PacingPolicy,

    /// Storage clearing script (defaults to [`DEFAULT_STORAGE_CLEAR_SCRIPT`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_clear_script: Option<String>,
}

impl FlowSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entry_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entry_url: entry_url.into(),
            steps: Vec::new(),
            pause: PacingPolicy::default(),
            navigation_pause: None,
            teardown_pause: default_teardown_pause(),
            storage_clear_script: None,
        }
    }

    pub fn with_step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_pause(mut self, pause: PacingPolicy) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_navigation_pause(mut self, pause: PacingPolicy) -> Self {
        self.navigation_pause = Some(pause);
        self
    }

    pub fn storage_clear_script(&self) -> &str {
        self.storage_clear_script
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_CLEAR_SCRIPT)
    }

    pub fn navigation_pause(&self) -> PacingPolicy {
        self.navigation_pause.unwrap_or(self.pause)
    }

    pub fn extraction_step(&self) -> Option<&StepSpec> {
        self.steps.iter().find(|step| step.extracts)
    }

    /// Copy of this flow with every delay set to zero
    pub fn without_pacing(&self) -> Self {
        self.scale_pacing(0.0)
    }

    /// Copy of this flow with every delay multiplied by `factor`
    pub fn scale_pacing(&self, factor: f64) -> Self {
        let mut flow = self.clone();
        flow.pause = flow.pause.scaled(factor);
        flow.navigation_pause = flow.navigation_pause.map(|p| p.scaled(factor));
        flow.teardown_pause = flow.teardown_pause.scaled(factor);
        for step in &mut flow.steps {
            step.pause = step.pause.map(|p| p.scaled(factor));
        }
        flow
    }

    /// Check structural rules before a flow is run
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.id.trim().is_empty() {
            return Err(FlowError::ValidationFailed("flow id is empty".into()));
        }
        if self.steps.is_empty() {
            return Err(FlowError::ValidationFailed(format!(
                "flow '{}' has no steps",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(FlowError::ValidationFailed(
                    "step name must not be empty".into(),
                ));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(FlowError::ValidationFailed(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
            if let Some(pause) = step.pause {
                if !pause.is_valid() {
                    return Err(FlowError::ValidationFailed(format!(
                        "step '{}' has an inverted pause range",
                        step.name
                    )));
                }
            }
        }

        match self.extraction_step() {
            None => {
                return Err(FlowError::ValidationFailed(format!(
                    "flow '{}' has no extraction step",
                    self.id
                )))
            }
            Some(step) if !step.is_fatal_on_error() => {
                return Err(FlowError::ValidationFailed(format!(
                    "extraction step '{}' must abort on error",
                    step.name
                )))
            }
            Some(_) => {}
        }

        let pauses = [
            Some(self.pause),
            self.navigation_pause,
            Some(self.teardown_pause),
        ];
        if pauses.iter().flatten().any(|p| !p.is_valid()) {
            return Err(FlowError::ValidationFailed(format!(
                "flow '{}' has an inverted pause range",
                self.id
            )));
        }

        Ok(())
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, FlowError> {
        let flow: FlowSpec = serde_yaml::from_str(raw)?;
        flow.validate()?;
        Ok(flow)
    }

    pub fn load(path: &Path) -> Result<Self, FlowError> {
        let raw = std::fs::read_to_string(path).map_err(|err| FlowError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn to_yaml(&self) -> Result<String, FlowError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Request parameters substituted into script templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepParams {
    pub reg_no: String,
    pub chassis_no: String,
    pub rto_value: String,
}

impl StepParams {
    pub fn new(
        reg_no: impl Into<String>,
        chassis_no: impl Into<String>,
        rto_value: impl Into<String>,
    ) -> Self {
        Self {
            reg_no: reg_no.into(),
            chassis_no: chassis_no.into(),
            rto_value: rto_value.into(),
        }
    }

    fn value(&self, name: &str) -> Option<&str> {
        match name {
            "reg_no" => Some(&self.reg_no),
            "chassis_no" => Some(&self.chassis_no),
            "rto_value" => Some(&self.rto_value),
            _ => None,
        }
    }

    /// Replace `{{name}}` with the JS string literal of the named parameter
    ///
    /// Single left-to-right pass over the template; inserted values are never rescanned.
    /// Unknown placeholders are left untouched.
    pub fn render(&self, template: &str) -> String {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start + 2..];
            let known = tail
                .find("}}")
                .and_then(|end| self.value(&tail[..end]).map(|value| (end, value)));
            match known {
                Some((end, value)) => {
                    rendered.push_str(&serde_json::Value::String(value.to_string()).to_string());
                    rest = &tail[end + 2..];
                }
                None => {
                    rendered.push('{');
                    rest = &rest[start + 1..];
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_flow() -> FlowSpec {
        FlowSpec::new("demo", "Demo", "https://example.com")
            .with_step(StepSpec::click_if_present(
                "Close modal",
                FlowState::ModalHandled,
                ".btn-close",
            ))
            .with_step(
                StepSpec::script("Get value", FlowState::Extracted, "return 'SUCCESS: 1'")
                    .extracting(),
            )
    }

    #[test]
    fn render_substitutes_json_literals() {
        let params = StepParams::new("DL1ABC1234", "MA3\"X", "53");
        let rendered = params.render("reg.value = {{reg_no}}; ch.value = {{chassis_no}}; {{other}}");
        assert_eq!(
            rendered,
            r#"reg.value = "DL1ABC1234"; ch.value = "MA3\"X"; {{other}}"#
        );
    }

    #[test]
    fn render_never_rescans_inserted_values() {
        let params = StepParams::new("{{rto_value}}", "{{chassis_no}}", "+alert(1)+");
        assert_eq!(
            params.render("reg.value = {{reg_no}}; ch.value = {{chassis_no}};"),
            r#"reg.value = "{{rto_value}}"; ch.value = "{{chassis_no}}";"#
        );
        assert_eq!(params.render("{{{rto_value}} }}"), r#"{"+alert(1)+" }}"#);
        assert_eq!(params.render("tail {{reg_no"), "tail {{reg_no");
    }

    #[test]
    fn validation_rules() {
        assert!(minimal_flow().validate().is_ok());

        let mut empty_id = minimal_flow();
        empty_id.id = " ".into();
        assert!(empty_id.validate().is_err());

        let mut no_steps = minimal_flow();
        no_steps.steps.clear();
        assert!(no_steps.validate().is_err());

        let mut duplicate = minimal_flow();
        duplicate.steps[1].name = "Close modal".into();
        assert!(duplicate.validate().is_err());

        let mut soft_extract = minimal_flow();
        soft_extract.steps[1].on_error = FailureStrategy::Continue;
        assert!(soft_extract.validate().is_err());

        let mut no_extract = minimal_flow();
        no_extract.steps[1].extracts = false;
        assert!(no_extract.validate().is_err());

        let inverted = minimal_flow().with_pause(PacingPolicy::between_ms(10, 1));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_keeps_defaults() {
        let raw = r#"
id: demo
name: Demo
entry_url: https://example.com
steps:
  - name: Close modal
    state: modal_handled
    action: { type: click_if_present, selector: ".btn-close" }
  - name: Get value
    state: extracted
    on_error: abort
    extracts: true
    action:
      type: run_script
      script: "return 'SUCCESS: ' + {{reg_no}}"
"#;
        let flow = FlowSpec::from_yaml_str(raw).unwrap();
        assert_eq!(flow.steps[0].on_error, FailureStrategy::Continue);
        assert_eq!(flow.pause, PacingPolicy::default());
        assert_eq!(flow.teardown_pause, PacingPolicy::between_ms(500, 1_000));
        assert_eq!(flow.storage_clear_script(), DEFAULT_STORAGE_CLEAR_SCRIPT);

        let again = FlowSpec::from_yaml_str(&flow.to_yaml().unwrap()).unwrap();
        assert_eq!(again, flow);
    }

    #[test]
    fn without_pacing_zeroes_every_delay() {
        let flow = minimal_flow()
            .with_navigation_pause(PacingPolicy::between_ms(2_000, 4_000))
            .with_step(
                StepSpec::script("Later", FlowState::Done, "x")
                    .with_pause(PacingPolicy::between_ms(5, 10)),
            );
        let quiet = flow.without_pacing();
        assert!(quiet.pause.is_zero());
        assert!(quiet.navigation_pause().is_zero());
        assert!(quiet.teardown_pause.is_zero());
        assert!(quiet.steps.iter().all(|s| s.pause.map_or(true, |p| p.is_zero())));
    }
}
