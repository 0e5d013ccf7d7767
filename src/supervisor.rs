//! Run supervisor: one time-bounded flow execution inside its own workspace

use action_flow::{FlowController, FlowJournal, FlowReport, FlowResult, FlowSpec, FlowState};
use action_primitives::{InteractionPrimitives, SessionLauncher};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::request::RunRequest;
use crate::workspace::ScopedWorkspace;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Anything that turns a request into exactly one [`FlowResult`]
#[async_trait]
pub trait FlowRunner: Send + Sync {
    async fn execute(&self, request: &RunRequest) -> FlowResult;
}

type DriverSlot = Mutex<Option<Arc<dyn InteractionPrimitives>>>;

/// Runs one flow per call against a freshly launched driver
pub struct RunSupervisor {
    launcher: Arc<dyn SessionLauncher>,
    flow: Arc<FlowSpec>,
    workspace_root: Option<PathBuf>,
    shutdown_timeout: Duration,
}

impl RunSupervisor {
    pub fn new(launcher: Arc<dyn SessionLauncher>, flow: Arc<FlowSpec>) -> Self {
        Self {
            launcher,
            flow,
            workspace_root: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Create workspaces under `root` instead of the system temp dir
    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Execute the flow once, bounded by `request.timeout_sec`
    ///
    /// Always returns a result. The workspace is released exactly once on every path,
    /// after the driver has been shut down.
    pub async fn run(&self, request: &RunRequest) -> FlowResult {
        self.run_report(request).await.result
    }

    /// Like [`RunSupervisor::run`], also reporting the state the flow ended in
    pub async fn run_report(&self, request: &RunRequest) -> FlowReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, flow = %self.flow.id);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: &RunRequest) -> FlowReport {
        let workspace = match ScopedWorkspace::acquire(self.workspace_root.as_deref()) {
            Ok(workspace) => workspace,
            Err(err) => {
                warn!(error = %err, "workspace acquisition failed");
                return FlowReport {
                    state: FlowState::Failed,
                    result: FlowResult::failure([format!("workspace_error: {err}")]),
                };
            }
        };

        let journal = FlowJournal::new();
        let slot: DriverSlot = Mutex::new(None);
        let drive = AssertUnwindSafe(self.drive(request, workspace.path(), &journal, &slot));

        let report = match timeout(request.timeout(), drive.catch_unwind()).await {
            Ok(Ok(report)) => report,
            Ok(Err(panic)) => {
                warn!("flow panicked");
                journal.note(format!("Flow: ERROR: run panicked: {}", panic_message(&*panic)));
                failed(&journal)
            }
            Err(_) => {
                warn!(timeout_sec = request.timeout_sec, steps = journal.len(), "run timed out");
                journal.note(format!(
                    "Flow: ERROR: timed out after {}s",
                    request.timeout_sec
                ));
                FlowReport {
                    state: FlowState::TimedOut,
                    result: journal.failed_result(),
                }
            }
        };

        let driver = slot.lock().take();
        if let Some(driver) = driver {
            match timeout(self.shutdown_timeout, driver.shutdown()).await {
                Ok(Ok(())) => debug!("driver shut down"),
                Ok(Err(err)) => warn!(error = %err, "driver shutdown failed"),
                Err(_) => warn!("driver shutdown timed out"),
            }
        }

        if let Err(err) = workspace.release().await {
            warn!(error = %err, "workspace release failed");
        }

        info!(
            state = %report.state,
            success = report.result.success,
            messages = report.result.messages().len(),
            "run finished"
        );
        report
    }

    async fn drive(
        &self,
        request: &RunRequest,
        profile: &Path,
        journal: &FlowJournal,
        slot: &DriverSlot,
    ) -> FlowReport {
        let driver = match self.launcher.launch(profile, request.headless).await {
            Ok(driver) => driver,
            Err(err) => {
                warn!(error = %err, "driver launch failed");
                journal.note(format!("launch_error: {err}"));
                return failed(journal);
            }
        };
        *slot.lock() = Some(driver.clone());

        let controller = match FlowController::new(driver, self.flow.clone()) {
            Ok(controller) => controller,
            Err(err) => {
                journal.note(format!("flow_error: {err}"));
                return failed(journal);
            }
        };
        controller.execute(&request.params(), journal).await
    }
}

#[async_trait]
impl FlowRunner for RunSupervisor {
    async fn execute(&self, request: &RunRequest) -> FlowResult {
        self.run(request).await
    }
}

fn failed(journal: &FlowJournal) -> FlowReport {
    FlowReport {
        state: FlowState::Failed,
        result: journal.failed_result(),
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
