//! Interaction primitives - the capability contract between the flow engine and a browser
//!
//! This crate defines the small set of operations the flow engine needs from an
//! automation driver:
//! - open a page (navigate), evaluate a script, find an element, click it, close the page
//! - tear the whole driver down
//!
//! Every failure is an [`ActionError`] value. The [`into_text`] helper folds results into
//! the uniform text channel (`"ERROR: <cause>"`) so heterogeneous failures can be classified
//! through a single code path.
//!
//! [`ScriptedPrimitives`] is a deterministic in-memory driver used for dry runs and tests.

pub mod errors;
mod primitives;
pub mod scripted;
pub mod types;

pub use errors::*;
pub use primitives::*;
pub use scripted::{CallLog, ScriptFixture, ScriptRule, ScriptedLauncher, ScriptedPrimitives};
pub use types::*;
