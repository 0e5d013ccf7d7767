//! Deterministic in-memory driver
//!
//! `ScriptedPrimitives` answers scripts from a [`ScriptFixture`] instead of a browser.
//! Rules are matched in order by substring against the evaluated script; the first
//! match decides the reply. Every call is recorded so callers can assert on what the
//! flow actually did.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::{
    errors::ActionError,
    primitives::{InteractionPrimitives, SessionLauncher},
    types::{validate_url, ElementHandle, SessionId, SUCCESS_MARKER},
};

/// Canned behaviour for [`ScriptedPrimitives`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptFixture {
    /// Ordered reply rules
    #[serde(default)]
    pub rules: Vec<ScriptRule>,

    /// Reply used when no rule matches
    #[serde(default = "ScriptFixture::default_reply")]
    pub default_reply: String,

    /// Selectors that `find` reports as absent
    #[serde(default)]
    pub missing_selectors: Vec<String>,

    /// Selectors whose click fails
    #[serde(default)]
    pub unclickable_selectors: Vec<String>,

    /// Make `open` fail with this cause
    #[serde(default)]
    pub open_error: Option<String>,
}

/// One reply rule, matched by substring
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptRule {
    pub contains: String,

    #[serde(default)]
    pub reply: Option<String>,

    /// Fail the evaluate call instead of replying
    #[serde(default)]
    pub error: Option<String>,

    /// Never complete the evaluate call
    #[serde(default)]
    pub stall: bool,
}

impl Default for ScriptFixture {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: Self::default_reply(),
            missing_selectors: Vec::new(),
            unclickable_selectors: Vec::new(),
            open_error: None,
        }
    }
}

impl ScriptFixture {
    fn default_reply() -> String {
        SUCCESS_MARKER.to_string()
    }

    /// Parse a YAML (or JSON) fixture
    pub fn from_yaml_str(raw: &str) -> Result<Self, ActionError> {
        serde_yaml::from_str(raw).map_err(|err| ActionError::Config(err.to_string()))
    }

    /// Load a fixture file
    pub fn load(path: &Path) -> Result<Self, ActionError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ActionError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Reply `reply` to scripts containing `contains`
    pub fn reply(mut self, contains: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push(ScriptRule {
            contains: contains.into(),
            reply: Some(reply.into()),
            error: None,
            stall: false,
        });
        self
    }

    /// Fail scripts containing `contains`
    pub fn fail(mut self, contains: impl Into<String>, cause: impl Into<String>) -> Self {
        self.rules.push(ScriptRule {
            contains: contains.into(),
            reply: None,
            error: Some(cause.into()),
            stall: false,
        });
        self
    }

    /// Hang forever on scripts containing `contains`
    pub fn stall(mut self, contains: impl Into<String>) -> Self {
        self.rules.push(ScriptRule {
            contains: contains.into(),
            reply: None,
            error: None,
            stall: true,
        });
        self
    }

    /// Report `selector` as absent
    pub fn missing(mut self, selector: impl Into<String>) -> Self {
        self.missing_selectors.push(selector.into());
        self
    }

    /// Make clicks on `selector` fail
    pub fn unclickable(mut self, selector: impl Into<String>) -> Self {
        self.unclickable_selectors.push(selector.into());
        self
    }

    /// Make `open` fail
    pub fn open_error(mut self, cause: impl Into<String>) -> Self {
        self.open_error = Some(cause.into());
        self
    }

    fn rule_for(&self, script: &str) -> Option<&ScriptRule> {
        self.rules.iter().find(|rule| script.contains(&rule.contains))
    }
}

/// Everything a [`ScriptedPrimitives`] instance was asked to do
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    pub opened: Vec<String>,
    pub scripts: Vec<String>,
    pub found: Vec<String>,
    pub clicked: Vec<String>,
    pub closed: usize,
    pub shutdowns: usize,
}

impl CallLog {
    /// Whether any evaluated script contained `needle`
    pub fn evaluated(&self, needle: &str) -> bool {
        self.scripts.iter().any(|script| script.contains(needle))
    }
}

/// Scripted driver
pub struct ScriptedPrimitives {
    fixture: ScriptFixture,
    sessions: Mutex<HashSet<SessionId>>,
    calls: Mutex<CallLog>,
}

impl ScriptedPrimitives {
    pub fn new(fixture: ScriptFixture) -> Self {
        Self {
            fixture,
            sessions: Mutex::new(HashSet::new()),
            calls: Mutex::new(CallLog::default()),
        }
    }

    /// Snapshot of the recorded calls
    pub fn calls(&self) -> CallLog {
        self.calls.lock().clone()
    }

    fn ensure_session(&self, session: SessionId) -> Result<(), ActionError> {
        if self.sessions.lock().contains(&session) {
            Ok(())
        } else {
            Err(ActionError::UnknownSession(session.to_string()))
        }
    }
}

#[async_trait]
impl InteractionPrimitives for ScriptedPrimitives {
    async fn open(&self, url: &str) -> Result<SessionId, ActionError> {
        self.calls.lock().opened.push(url.to_string());
        validate_url(url)?;
        if let Some(cause) = &self.fixture.open_error {
            return Err(ActionError::Navigation(cause.clone()));
        }
        let session = SessionId::new();
        self.sessions.lock().insert(session);
        debug!(%session, url, "scripted session opened");
        Ok(session)
    }

    async fn evaluate(&self, session: SessionId, script: &str) -> Result<String, ActionError> {
        self.calls.lock().scripts.push(script.to_string());
        self.ensure_session(session)?;

        match self.fixture.rule_for(script) {
            Some(rule) if rule.stall => {
                debug!(contains = %rule.contains, "scripted evaluate stalling");
                std::future::pending().await
            }
            Some(ScriptRule {
                error: Some(cause), ..
            }) => Err(ActionError::Script(cause.clone())),
            Some(ScriptRule {
                reply: Some(reply), ..
            }) => Ok(reply.clone()),
            _ => Ok(self.fixture.default_reply.clone()),
        }
    }

    async fn find(
        &self,
        session: SessionId,
        selector: &str,
    ) -> Result<Option<ElementHandle>, ActionError> {
        self.calls.lock().found.push(selector.to_string());
        self.ensure_session(session)?;
        if self.fixture.missing_selectors.iter().any(|s| s == selector) {
            return Ok(None);
        }
        Ok(Some(ElementHandle::new(session, selector)))
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        self.calls.lock().clicked.push(handle.selector.clone());
        self.ensure_session(handle.session)?;
        if self
            .fixture
            .unclickable_selectors
            .iter()
            .any(|s| s == &handle.selector)
        {
            return Err(ActionError::NotClickable(handle.selector.clone()));
        }
        Ok(())
    }

    async fn close(&self, session: SessionId) -> Result<(), ActionError> {
        self.calls.lock().closed += 1;
        if self.sessions.lock().remove(&session) {
            Ok(())
        } else {
            Err(ActionError::UnknownSession(session.to_string()))
        }
    }

    async fn shutdown(&self) -> Result<(), ActionError> {
        self.calls.lock().shutdowns += 1;
        self.sessions.lock().clear();
        Ok(())
    }
}

/// Launcher handing out [`ScriptedPrimitives`] built from one fixture
///
/// Records the profile directory of every launch and whether it existed at the time.
pub struct ScriptedLauncher {
    fixture: ScriptFixture,
    launch_error: Option<String>,
    launches: Mutex<Vec<(PathBuf, bool)>>,
    drivers: Mutex<Vec<Arc<ScriptedPrimitives>>>,
}

impl ScriptedLauncher {
    pub fn new(fixture: ScriptFixture) -> Self {
        Self {
            fixture,
            launch_error: None,
            launches: Mutex::new(Vec::new()),
            drivers: Mutex::new(Vec::new()),
        }
    }

    /// Launcher whose every launch fails with `cause`
    pub fn failing(cause: impl Into<String>) -> Self {
        let mut launcher = Self::new(ScriptFixture::default());
        launcher.launch_error = Some(cause.into());
        launcher
    }

    /// Profile directories seen so far, with whether each existed at launch time
    pub fn launches(&self) -> Vec<(PathBuf, bool)> {
        self.launches.lock().clone()
    }

    /// Most recently launched driver
    pub fn last_driver(&self) -> Option<Arc<ScriptedPrimitives>> {
        self.drivers.lock().last().cloned()
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(
        &self,
        profile_dir: &Path,
        headless: bool,
    ) -> Result<Arc<dyn InteractionPrimitives>, ActionError> {
        self.launches
            .lock()
            .push((profile_dir.to_path_buf(), profile_dir.is_dir()));
        if let Some(cause) = &self.launch_error {
            return Err(ActionError::Launch(cause.clone()));
        }
        debug!(profile = %profile_dir.display(), headless, "scripted driver launched");
        let driver = Arc::new(ScriptedPrimitives::new(self.fixture.clone()));
        self.drivers.lock().push(driver.clone());
        Ok(driver)
    }
}
