//! Capability traits implemented by interaction drivers
//!
//! The flow engine never assumes a concrete automation library: it only sees
//! [`InteractionPrimitives`], and obtains one per run from a [`SessionLauncher`].

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::{
    errors::ActionError,
    types::{into_text, ElementHandle, SessionId},
};

/// Interaction primitives trait
///
/// Every call may fail; failures are returned as [`ActionError`] values and never
/// swallowed by the driver.
#[async_trait]
pub trait InteractionPrimitives: Send + Sync {
    /// Open a new page and navigate it to `url`
    async fn open(&self, url: &str) -> Result<SessionId, ActionError>;

    /// Run a script in the page context and return its result as text
    async fn evaluate(&self, session: SessionId, script: &str) -> Result<String, ActionError>;

    /// Locate the first element matching `selector`, `None` when nothing matches
    async fn find(
        &self,
        session: SessionId,
        selector: &str,
    ) -> Result<Option<ElementHandle>, ActionError>;

    /// Dispatch a click on a previously located element
    async fn click(&self, handle: &ElementHandle) -> Result<(), ActionError>;

    /// Close one page
    async fn close(&self, session: SessionId) -> Result<(), ActionError>;

    /// Tear the whole driver down; must be idempotent
    async fn shutdown(&self) -> Result<(), ActionError>;

    /// Evaluate a script and fold any failure into the `ERROR: <cause>` text channel
    async fn evaluate_text(&self, session: SessionId, script: &str) -> String {
        into_text(self.evaluate(session, script).await)
    }
}

/// Builds one driver instance bound to a private profile directory
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(
        &self,
        profile_dir: &Path,
        headless: bool,
    ) -> Result<Arc<dyn InteractionPrimitives>, ActionError>;
}
