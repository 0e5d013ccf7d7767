//! Process isolation boundary and the handoff artifact
//!
//! The parent spawns `<program> <leading_args> --handoff=<path> ...` in its own process
//! group and waits for `timeout + grace_period`. The child runs a [`RunSupervisor`] and
//! writes its [`FlowResult`] to the handoff path as JSON before exiting. The parent reads
//! the artifact once and always removes it, together with the per-run workspace root the
//! child keeps its browser profile in.

use action_flow::FlowResult;
use async_trait::async_trait;
use futures::FutureExt;
use std::io::{self, Write};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::RunError;
use crate::request::RunRequest;
use crate::supervisor::{panic_message, FlowRunner, RunSupervisor};
use crate::workspace::ScopedWorkspace;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_REAP_TIMEOUT: Duration = Duration::from_secs(10);

const HANDOFF_PREFIX: &str = "rto_child_";

/// Runs each request in a child process with a hard outer deadline
#[derive(Debug, Clone)]
pub struct IsolationBoundary {
    program: PathBuf,
    leading_args: Vec<String>,
    grace_period: Duration,
    reap_timeout: Duration,
    handoff_dir: PathBuf,
    workspace_dir: Option<PathBuf>,
}

impl IsolationBoundary {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
            reap_timeout: DEFAULT_REAP_TIMEOUT,
            handoff_dir: std::env::temp_dir(),
            workspace_dir: None,
        }
    }

    /// Boundary re-executing the running binary
    pub fn current_exe() -> Result<Self, RunError> {
        let program = std::env::current_exe()
            .map_err(|err| RunError::Config(format!("cannot locate current executable: {err}")))?;
        Ok(Self::new(program))
    }

    /// Arguments placed before the per-request child arguments
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_reap_timeout(mut self, reap_timeout: Duration) -> Self {
        self.reap_timeout = reap_timeout;
        self
    }

    pub fn with_handoff_dir(mut self, handoff_dir: impl Into<PathBuf>) -> Self {
        self.handoff_dir = handoff_dir.into();
        self
    }

    /// Where per-run workspace roots are created (system temp dir by default)
    pub fn with_workspace_dir(mut self, workspace_dir: impl Into<PathBuf>) -> Self {
        self.workspace_dir = Some(workspace_dir.into());
        self
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Fresh, collision-resistant artifact path
    pub fn handoff_path(&self) -> PathBuf {
        self.handoff_dir
            .join(format!("{HANDOFF_PREFIX}{}.json", Uuid::new_v4().simple()))
    }

    /// Run `request` in a child process; never hangs past `timeout + grace + reap`
    pub async fn run(&self, request: &RunRequest) -> FlowResult {
        let run_root = match ScopedWorkspace::acquire_run_root(self.workspace_dir.as_deref()) {
            Ok(run_root) => run_root,
            Err(err) => {
                warn!(error = %err, "run root acquisition failed");
                return FlowResult::failure([format!("workspace_error: {err}")]);
            }
        };
        let handoff = self.handoff_path();
        let result = self.supervise(request, &handoff, run_root.path()).await;
        match tokio::fs::remove_file(&handoff).await {
            Ok(()) => debug!(path = %handoff.display(), "handoff removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %handoff.display(), error = %err, "failed to remove handoff"),
        }
        if let Err(err) = run_root.release().await {
            warn!(error = %err, "run root release failed");
        }
        result
    }

    async fn supervise(&self, request: &RunRequest, handoff: &Path, run_root: &Path) -> FlowResult {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(request.child_args(handoff, run_root))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(program = %self.program.display(), error = %err, "failed to spawn child");
                return FlowResult::failure([format!("spawn_error: {err}")]);
            }
        };
        let pid = child.id();
        info!(pid, timeout_sec = request.timeout_sec, "child spawned");

        let deadline = request.timeout() + self.grace_period;
        let waited = timeout(deadline, child.wait()).await;
        // the browser and anything else the child started share its group
        kill_process_group(pid);
        match waited {
            Ok(Ok(status)) if status.success() => debug!(%status, "child exited"),
            Ok(Ok(status)) => warn!(%status, "child exited abnormally"),
            Ok(Err(err)) => warn!(error = %err, "failed to wait for child"),
            Err(_) => {
                warn!(deadline_sec = deadline.as_secs(), "child exceeded deadline, killing");
                if let Err(err) = child.start_kill() {
                    debug!(error = %err, "child already gone");
                }
                if timeout(self.reap_timeout, child.wait()).await.is_err() {
                    warn!("child was not reaped in time");
                }
                return FlowResult::failure(["child_timeout"]);
            }
        }

        match read_handoff(handoff).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "handoff unreadable");
                FlowResult::failure([format!("read_error: {err}")])
            }
        }
    }
}

/// SIGKILL whatever is left in the process group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pgid) = pid
        .and_then(|pid| libc::pid_t::try_from(pid).ok())
        .filter(|pgid| *pgid > 1)
    else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the whole group
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
        debug!(pgid, "process group killed");
        return;
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() != Some(libc::ESRCH) {
        warn!(pgid, error = %err, "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl FlowRunner for IsolationBoundary {
    async fn execute(&self, request: &RunRequest) -> FlowResult {
        self.run(request).await
    }
}

/// Write `result` atomically: temp file in the same directory, then rename
pub fn write_handoff(path: &Path, result: &FlowResult) -> Result<(), RunError> {
    let io_err = |err: &dyn std::fmt::Display| RunError::HandoffIo {
        path: path.display().to_string(),
        reason: err.to_string(),
    };
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(dir).map_err(|err| io_err(&err))?;
    serde_json::to_writer(&mut file, result).map_err(|err| io_err(&err))?;
    file.flush().map_err(|err| io_err(&err))?;
    file.persist(path).map_err(|err| io_err(&err.error))?;
    Ok(())
}

/// Read and check a handoff artifact
pub async fn read_handoff(path: &Path) -> Result<FlowResult, RunError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| RunError::HandoffIo {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    let result: FlowResult =
        serde_json::from_slice(&bytes).map_err(|err| RunError::HandoffDecode(err.to_string()))?;
    if !result.is_consistent() {
        return Err(RunError::Inconsistent(format!(
            "success={} mobile_number={:?}",
            result.success, result.extracted
        )));
    }
    Ok(result)
}

/// Child side: run the supervisor and always leave a handoff behind
pub async fn run_child(
    supervisor: &RunSupervisor,
    request: &RunRequest,
    handoff: &Path,
) -> Result<FlowResult, RunError> {
    let result = match AssertUnwindSafe(supervisor.run(request)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => FlowResult::failure([format!("child_error: {}", panic_message(&*panic))]),
    };
    write_handoff(handoff, &result)?;
    Ok(result)
}
