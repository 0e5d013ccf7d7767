//! Flow controller - the step-sequencing state machine

use action_primitives::{error_text, is_error_text, ActionError, InteractionPrimitives, SessionId};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::executor::StepExecutor;
use crate::outcome::{FlowJournal, FlowResult, StepOutcome};
use crate::strategies::FailureHandler;
use crate::types::{FlowSpec, FlowState, StepParams};

/// Log label used when the entry page cannot be loaded
pub const NAVIGATION_STEP: &str = "Load website";

/// Final state plus the result record of one execution
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub state: FlowState,
    pub result: FlowResult,
}

/// Sequences the steps of one [`FlowSpec`] against one driver
pub struct FlowController {
    primitives: Arc<dyn InteractionPrimitives>,
    flow: Arc<FlowSpec>,
    executor: StepExecutor,
}

impl FlowController {
    /// Validates `flow` up front so a broken definition never touches the site
    pub fn new(
        primitives: Arc<dyn InteractionPrimitives>,
        flow: Arc<FlowSpec>,
    ) -> Result<Self, FlowError> {
        flow.validate()?;
        Ok(Self {
            executor: StepExecutor::new(primitives.clone()),
            primitives,
            flow,
        })
    }

    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.executor = self.executor.with_failure_handler(handler);
        self
    }

    /// Run the whole flow once, appending every outcome to `journal`
    ///
    /// Never returns an error: failures end in [`FlowState::Failed`] with the partial log.
    pub async fn execute(&self, params: &StepParams, journal: &FlowJournal) -> FlowReport {
        let flow_id = self.flow.id.as_str();
        let mut state = FlowState::Init;

        let session = match self.primitives.open(&self.flow.entry_url).await {
            Ok(session) => session,
            Err(err) => {
                warn!(flow = flow_id, error = %err, "entry page failed to load");
                journal.record(StepOutcome::fatal(NAVIGATION_STEP, error_text(err)));
                transition(flow_id, &mut state, FlowState::Failed);
                return FlowReport {
                    state,
                    result: journal.failed_result(),
                };
            }
        };
        transition(flow_id, &mut state, FlowState::Navigated);

        self.flow.navigation_pause().pause().await;
        self.clear_storage(session).await;

        for step in &self.flow.steps {
            let outcome = self
                .executor
                .execute(session, step, params, self.flow.pause)
                .await;
            let fatal = outcome.is_fatal();
            journal.record(outcome);
            if fatal {
                transition(flow_id, &mut state, FlowState::Failed);
                break;
            }
            transition(flow_id, &mut state, step.state);
        }

        self.flow.teardown_pause.pause().await;
        self.clear_storage(session).await;
        best_effort("close session", self.primitives.close(session)).await;

        let result = match (state, journal.extracted()) {
            (FlowState::Failed, _) | (_, None) => {
                transition(flow_id, &mut state, FlowState::Failed);
                journal.failed_result()
            }
            (_, Some(value)) => {
                transition(flow_id, &mut state, FlowState::Done);
                journal.success_result(value)
            }
        };

        info!(flow = flow_id, state = %state, success = result.success, "flow finished");
        FlowReport { state, result }
    }

    async fn clear_storage(&self, session: SessionId) {
        let script = self.flow.storage_clear_script();
        if let Some(text) = best_effort("clear storage", self.primitives.evaluate(session, script)).await {
            if is_error_text(&text) {
                debug!(text = %text, "storage clear reported an error");
            }
        }
    }
}

fn transition(flow_id: &str, state: &mut FlowState, next: FlowState) {
    if *state != next {
        debug!(flow = flow_id, from = %state, to = %next, "flow state transition");
        *state = next;
    }
}

/// Run a tolerant operation whose failure must never affect the flow
pub async fn best_effort<T, F>(label: &str, operation: F) -> Option<T>
where
    F: Future<Output = Result<T, ActionError>>,
{
    match operation.await {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(operation = label, error = %err, "best-effort operation failed");
            None
        }
    }
}
