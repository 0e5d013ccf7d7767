//! Scoped browser profile directories

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{Builder, TempDir};
use tracing::debug;

use crate::errors::RunError;

const WORKSPACE_PREFIX: &str = "rto_profile_";
const RUN_ROOT_PREFIX: &str = "rto_run_";
const REMOVE_ATTEMPTS: u32 = 3;
const REMOVE_BACKOFF: Duration = Duration::from_millis(200);

/// A uniquely named directory owned by exactly one run
///
/// Removed by [`ScopedWorkspace::release`]; dropping it without releasing still removes
/// it, synchronously and silently.
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: TempDir,
}

impl ScopedWorkspace {
    /// Create `rto_profile_<random>` under `root` (system temp dir when `None`)
    pub fn acquire(root: Option<&Path>) -> Result<Self, RunError> {
        Self::acquire_prefixed(root, WORKSPACE_PREFIX)
    }

    /// Create `rto_run_<random>`: the parent-owned root a child places its profile in
    pub fn acquire_run_root(root: Option<&Path>) -> Result<Self, RunError> {
        Self::acquire_prefixed(root, RUN_ROOT_PREFIX)
    }

    fn acquire_prefixed(root: Option<&Path>, prefix: &str) -> Result<Self, RunError> {
        let mut builder = Builder::new();
        builder.prefix(prefix);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|err| RunError::Workspace(err.to_string()))?;
        debug!(path = %dir.path().display(), "workspace acquired");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory, retrying while the browser may still hold files in it
    pub async fn release(self) -> Result<(), RunError> {
        let path: PathBuf = self.dir.path().to_path_buf();
        let mut last_err = match self.dir.close() {
            Ok(()) => {
                debug!(path = %path.display(), "workspace released");
                return Ok(());
            }
            Err(err) => err,
        };

        for attempt in 1..=REMOVE_ATTEMPTS {
            tokio::time::sleep(REMOVE_BACKOFF * attempt).await;
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(err) => {
                    debug!(path = %path.display(), attempt, error = %err, "workspace removal retry");
                    last_err = err;
                }
            }
        }
        Err(RunError::Workspace(format!(
            "failed to remove {}: {last_err}",
            path.display()
        )))
    }
}
