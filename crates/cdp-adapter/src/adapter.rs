use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use action_primitives::{
    ActionError, ElementHandle, InteractionPrimitives, SessionId, SessionLauncher,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{launch_args, CdpConfig};

const BROWSER_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Interaction primitives backed by one Chromium process.
pub struct ChromiumPrimitives {
    browser: Mutex<Option<Browser>>,
    handler: parking_lot::Mutex<Option<JoinHandle<()>>>,
    pages: DashMap<SessionId, Page>,
    elements: DashMap<Uuid, (SessionId, Element)>,
}

impl ChromiumPrimitives {
    /// Start Chromium with `profile_dir` as its user data directory.
    pub async fn launch(
        config: &CdpConfig,
        profile_dir: &Path,
        headless: bool,
    ) -> Result<Self, ActionError> {
        let browser_config = browser_config(config, profile_dir, headless)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| ActionError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "cdp handler event error");
                }
            }
        });

        info!(profile = %profile_dir.display(), headless, "chromium launched");
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: parking_lot::Mutex::new(Some(handler_task)),
            pages: DashMap::new(),
            elements: DashMap::new(),
        })
    }

    fn page(&self, session: SessionId) -> Result<Page, ActionError> {
        self.pages
            .get(&session)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ActionError::UnknownSession(session.to_string()))
    }
}

fn browser_config(
    cfg: &CdpConfig,
    profile_dir: &Path,
    headless: bool,
) -> Result<BrowserConfig, ActionError> {
    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
        .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms));

    if !headless {
        builder = builder.with_head();
    }
    if cfg.disable_sandbox {
        builder = builder.no_sandbox();
    }
    builder = builder.args(launch_args(headless, &cfg.extra_args));

    match cfg.resolve_executable() {
        Some(executable) => builder = builder.chrome_executable(executable),
        None => {
            return Err(ActionError::Launch(
                "no Chrome/Chromium executable found; set RTO_PROBE_CHROME".into(),
            ))
        }
    }
    builder = builder.user_data_dir(profile_dir);

    builder
        .build()
        .map_err(|err| ActionError::Config(format!("browser config error: {err}")))
}

fn navigation_error(err: CdpError) -> ActionError {
    match err {
        CdpError::Timeout => ActionError::NavTimeout("page load timed out".into()),
        other => ActionError::Navigation(other.to_string()),
    }
}

fn script_error(err: CdpError) -> ActionError {
    match err {
        CdpError::Timeout => ActionError::NavTimeout("script evaluation timed out".into()),
        other => ActionError::Script(other.to_string()),
    }
}

/// JSON strings are returned raw, `null` as an empty string, anything else as JSON text.
fn render_value(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl InteractionPrimitives for ChromiumPrimitives {
    async fn open(&self, url: &str) -> Result<SessionId, ActionError> {
        action_primitives::validate_url(url)?;
        let page = {
            let guard = self.browser.lock().await;
            let browser = guard
                .as_ref()
                .ok_or_else(|| ActionError::Internal("browser already shut down".into()))?;
            browser.new_page(url).await.map_err(navigation_error)?
        };
        let session = SessionId::new();
        self.pages.insert(session, page);
        debug!(%session, url, "page opened");
        Ok(session)
    }

    async fn evaluate(&self, session: SessionId, script: &str) -> Result<String, ActionError> {
        let page = self.page(session)?;
        let result = page.evaluate(script).await.map_err(script_error)?;
        Ok(render_value(result.value()))
    }

    async fn find(
        &self,
        session: SessionId,
        selector: &str,
    ) -> Result<Option<ElementHandle>, ActionError> {
        let page = self.page(session)?;
        let mut elements = page
            .find_elements(selector)
            .await
            .map_err(|err| ActionError::Lookup(format!("{selector}: {err}")))?;
        if elements.is_empty() {
            return Ok(None);
        }
        let element = elements.swap_remove(0);
        let handle = ElementHandle::new(session, selector);
        self.elements.insert(handle.id, (session, element));
        Ok(Some(handle))
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        // handles are single-use; the element is released once clicked
        let (_, (session, element)) = self
            .elements
            .remove(&handle.id)
            .ok_or_else(|| ActionError::UnknownElement(handle.selector.clone()))?;
        if !self.pages.contains_key(&session) {
            return Err(ActionError::UnknownSession(session.to_string()));
        }
        element
            .click()
            .await
            .map_err(|err| ActionError::NotClickable(format!("{}: {err}", handle.selector)))?;
        Ok(())
    }

    async fn close(&self, session: SessionId) -> Result<(), ActionError> {
        self.elements.retain(|_, (owner, _)| *owner != session);
        let (_, page) = self
            .pages
            .remove(&session)
            .ok_or_else(|| ActionError::UnknownSession(session.to_string()))?;
        page.close()
            .await
            .map_err(|err| ActionError::CdpIo(err.to_string()))
    }

    async fn shutdown(&self) -> Result<(), ActionError> {
        self.elements.clear();
        self.pages.clear();

        let browser = self.browser.lock().await.take();
        if let Some(mut browser) = browser {
            if let Err(err) = browser.close().await {
                debug!(error = %err, "graceful browser close failed");
            }
            match tokio::time::timeout(BROWSER_EXIT_TIMEOUT, browser.wait()).await {
                Ok(_) => debug!("browser exited"),
                Err(_) => {
                    warn!("browser did not exit in time, killing");
                    if let Some(Err(err)) = browser.kill().await {
                        warn!(error = %err, "failed to kill browser");
                    }
                }
            }
        }

        if let Some(task) = self.handler.lock().take() {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for ChromiumPrimitives {
    fn drop(&mut self) {
        if let Some(task) = self.handler.get_mut().take() {
            task.abort();
        }
    }
}

/// Launches one [`ChromiumPrimitives`] per run.
#[derive(Clone, Debug, Default)]
pub struct ChromiumLauncher {
    config: CdpConfig,
}

impl ChromiumLauncher {
    pub fn new(config: CdpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.config
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        profile_dir: &Path,
        headless: bool,
    ) -> Result<Arc<dyn InteractionPrimitives>, ActionError> {
        let driver = ChromiumPrimitives::launch(&self.config, profile_dir, headless).await?;
        Ok(Arc::new(driver))
    }
}
