//! Step executor implementation

use action_primitives::{error_text, is_error_text, is_success_text, InteractionPrimitives, SessionId};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use stealth::PacingPolicy;
use tracing::{debug, error};

use crate::outcome::StepOutcome;
use crate::strategies::{DefaultFailureHandler, FailureHandler};
use crate::types::{StepAction, StepParams, StepSpec};

/// Runs one declarative step and produces exactly one [`StepOutcome`]
pub struct StepExecutor {
    primitives: Arc<dyn InteractionPrimitives>,
    failure_handler: Arc<dyn FailureHandler>,
}

impl StepExecutor {
    pub fn new(primitives: Arc<dyn InteractionPrimitives>) -> Self {
        Self {
            primitives,
            failure_handler: Arc::new(DefaultFailureHandler::new()),
        }
    }

    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = handler;
        self
    }

    /// Execute `step`, classify its text and apply pacing
    ///
    /// A panic inside the action is recorded as a fatal outcome. Pacing is skipped after
    /// a fatal outcome since the flow stops there.
    pub async fn execute(
        &self,
        session: SessionId,
        step: &StepSpec,
        params: &StepParams,
        default_pause: PacingPolicy,
    ) -> StepOutcome {
        debug!(step = %step.name, action = step.action.kind(), "executing step");

        let attempt = AssertUnwindSafe(self.run_action(session, &step.action, params))
            .catch_unwind()
            .await;

        let outcome = match attempt {
            Ok(text) => self.failure_handler.classify(step, text),
            Err(panic) => {
                let cause = panic_message(panic.as_ref());
                error!(step = %step.name, cause = %cause, "step panicked");
                StepOutcome::fatal(&step.name, error_text(format!("step panicked: {cause}")))
            }
        };

        debug!(step = %step.name, kind = ?outcome.kind, text = %outcome.text, "step finished");

        if !outcome.is_fatal() {
            step.pause.unwrap_or(default_pause).pause().await;
        }
        outcome
    }

    async fn run_action(&self, session: SessionId, action: &StepAction, params: &StepParams) -> String {
        match action {
            StepAction::RunScript { script } => self.evaluate(session, script, params).await,
            StepAction::ClickIfPresent { selector } => self.click_if_present(session, selector).await,
            StepAction::ConditionalScript {
                probe,
                then,
                otherwise,
            } => {
                let probed = self.evaluate(session, probe, params).await;
                if is_success_text(&probed) && !is_error_text(&probed) {
                    self.evaluate(session, then, params).await
                } else if let Some(otherwise) = otherwise {
                    self.evaluate(session, otherwise, params).await
                } else {
                    probed
                }
            }
        }
    }

    async fn evaluate(&self, session: SessionId, template: &str, params: &StepParams) -> String {
        let script = params.render(template);
        self.primitives.evaluate_text(session, &script).await
    }

    async fn click_if_present(&self, session: SessionId, selector: &str) -> String {
        match self.primitives.find(session, selector).await {
            Ok(Some(handle)) => match self.primitives.click(&handle).await {
                Ok(()) => format!("SUCCESS: clicked {selector}"),
                Err(err) => error_text(err),
            },
            Ok(None) => error_text(format!("{selector} not found")),
            Err(err) => error_text(err),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeKind;
    use crate::types::FlowState;
    use action_primitives::{ActionError, ElementHandle, ScriptFixture, ScriptedPrimitives};
    use panicking::PanickingDriver;

    async fn open(driver: &Arc<ScriptedPrimitives>) -> SessionId {
        driver.open("https://example.com").await.unwrap()
    }

    #[tokio::test]
    async fn click_if_present_reports_missing_element() {
        let driver = Arc::new(ScriptedPrimitives::new(
            ScriptFixture::default().missing(".btn-close"),
        ));
        let session = open(&driver).await;
        let executor = StepExecutor::new(driver.clone());

        let step = StepSpec::click_if_present("Close modal", FlowState::ModalHandled, ".btn-close");
        let outcome = executor
            .execute(session, &step, &StepParams::new("a", "b", "53"), PacingPolicy::none())
            .await;
        assert_eq!(outcome.kind, OutcomeKind::SoftError);
        assert_eq!(outcome.render(), "Close modal: ERROR: .btn-close not found");

        let step = StepSpec::click_if_present("Click ok", FlowState::ModalHandled, "#ok");
        let outcome = executor
            .execute(session, &step, &StepParams::new("a", "b", "53"), PacingPolicy::none())
            .await;
        assert_eq!(outcome.text, "SUCCESS: clicked #ok");
    }

    #[tokio::test]
    async fn conditional_runs_then_only_after_successful_probe() {
        let driver = Arc::new(ScriptedPrimitives::new(
            ScriptFixture::default()
                .reply("probe-ok", "SUCCESS: id=j_idt444")
                .reply("probe-miss", "ERROR")
                .reply("click-it", "SUCCESS: PF.ab"),
        ));
        let session = open(&driver).await;
        let executor = StepExecutor::new(driver.clone());
        let params = StepParams::new("a", "b", "53");

        let hit = StepSpec::conditional("Confirm", FlowState::ProceedClicked, "probe-ok", "click-it");
        let outcome = executor.execute(session, &hit, &params, PacingPolicy::none()).await;
        assert_eq!(outcome.text, "SUCCESS: PF.ab");

        let miss = StepSpec::conditional("Confirm 2", FlowState::ProceedClicked, "probe-miss", "click-it");
        let outcome = executor.execute(session, &miss, &params, PacingPolicy::none()).await;
        assert_eq!(outcome.text, "ERROR");
        assert_eq!(outcome.kind, OutcomeKind::SoftError);

        let calls = driver.calls();
        assert_eq!(calls.scripts.iter().filter(|s| s.contains("click-it")).count(), 1);
    }

    #[tokio::test]
    async fn failed_probe_falls_back_to_otherwise_script() {
        let driver = Arc::new(ScriptedPrimitives::new(
            ScriptFixture::default()
                .reply("probe-miss", "ERROR: no confirm dialog")
                .reply("click-it", "SUCCESS: PF.ab")
                .reply("fallback(", "SUCCESS: submitted directly")
                .reply("broken-fallback", "ERROR: form gone"),
        ));
        let session = open(&driver).await;
        let executor = StepExecutor::new(driver.clone());
        let params = StepParams::new("a", "b", "53");
        let conditional = |otherwise: &str| {
            StepSpec::new(
                "Confirm",
                FlowState::ProceedClicked,
                StepAction::ConditionalScript {
                    probe: "probe-miss".into(),
                    then: "click-it".into(),
                    otherwise: Some(otherwise.into()),
                },
            )
        };

        let outcome = executor
            .execute(session, &conditional("fallback({{rto_value}})"), &params, PacingPolicy::none())
            .await;
        assert_eq!(outcome.text, "SUCCESS: submitted directly");
        assert_eq!(outcome.kind, OutcomeKind::Ok);
        assert!(driver.calls().evaluated(r#"fallback("53")"#));

        let outcome = executor
            .execute(session, &conditional("broken-fallback"), &params, PacingPolicy::none())
            .await;
        assert_eq!(outcome.text, "ERROR: form gone");
        assert_eq!(outcome.kind, OutcomeKind::SoftError);

        assert!(!driver.calls().evaluated("click-it"));
    }

    #[tokio::test]
    async fn scripts_are_rendered_with_params() {
        let driver = Arc::new(ScriptedPrimitives::new(ScriptFixture::default()));
        let session = open(&driver).await;
        let executor = StepExecutor::new(driver.clone());

        let step = StepSpec::script("Fill form", FlowState::FormFilled, "reg.value = {{reg_no}};").fatal();
        executor
            .execute(session, &step, &StepParams::new("DL1ABC1234", "b", "53"), PacingPolicy::none())
            .await;
        assert!(driver.calls().evaluated(r#"reg.value = "DL1ABC1234";"#));
    }

    #[tokio::test]
    async fn script_failure_becomes_error_text() {
        let driver = Arc::new(ScriptedPrimitives::new(
            ScriptFixture::default().fail("Services", "ReferenceError: x is not defined"),
        ));
        let session = open(&driver).await;
        let executor = StepExecutor::new(driver);

        let step = StepSpec::script("Open Services", FlowState::MenuOpened, "open('Services')");
        let outcome = executor
            .execute(session, &step, &StepParams::new("a", "b", "53"), PacingPolicy::none())
            .await;
        assert_eq!(
            outcome.text,
            "ERROR: JavaScript execution error: ReferenceError: x is not defined"
        );
        assert_eq!(outcome.kind, OutcomeKind::SoftError);
    }

    #[test]
    fn panic_is_recorded_as_fatal_outcome() {
        let executor = StepExecutor::new(Arc::new(PanickingDriver));
        let step = StepSpec::script("Set RTO", FlowState::TargetSelected, "x");
        let outcome = tokio_test::block_on(executor.execute(
            SessionId::new(),
            &step,
            &StepParams::new("a", "b", "53"),
            PacingPolicy::none(),
        ));
        assert!(outcome.is_fatal());
        assert_eq!(outcome.text, "ERROR: step panicked: driver exploded");
    }

    mod panicking {
        use super::*;

        pub struct PanickingDriver;

        #[async_trait::async_trait]
        impl InteractionPrimitives for PanickingDriver {
            async fn open(&self, _url: &str) -> Result<SessionId, ActionError> {
                Ok(SessionId::new())
            }

            async fn evaluate(&self, _session: SessionId, _script: &str) -> Result<String, ActionError> {
                panic!("driver exploded")
            }

            async fn find(
                &self,
                _session: SessionId,
                _selector: &str,
            ) -> Result<Option<ElementHandle>, ActionError> {
                Ok(None)
            }

            async fn click(&self, _handle: &ElementHandle) -> Result<(), ActionError> {
                Ok(())
            }

            async fn close(&self, _session: SessionId) -> Result<(), ActionError> {
                Ok(())
            }

            async fn shutdown(&self) -> Result<(), ActionError> {
                Ok(())
            }
        }
    }
}
