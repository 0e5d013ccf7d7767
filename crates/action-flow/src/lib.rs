//! Flow Orchestration Layer
//!
//! Runs a fixed, declarative sequence of interaction steps against one page:
//! - [`StepSpec`] / [`FlowSpec`] describe what to do as data (scripts are templates)
//! - [`StepExecutor`] runs one step and classifies it into exactly one [`StepOutcome`]
//! - [`FlowController`] sequences the steps as a state machine, short-circuits on fatal
//!   outcomes and always performs best-effort storage clearing and session close
//!
//! Outcomes land in a shared [`FlowJournal`] so a supervisor that abandons the controller
//! (for example on timeout) still has the partial log.

pub mod controller;
pub mod errors;
pub mod executor;
pub mod outcome;
pub mod strategies;
pub mod types;

pub use controller::{best_effort, FlowController, FlowReport, NAVIGATION_STEP};
pub use errors::FlowError;
pub use executor::StepExecutor;
pub use outcome::{FlowDetails, FlowJournal, FlowResult, OutcomeKind, StepOutcome};
pub use strategies::{extract_value, DefaultFailureHandler, FailureHandler};
pub use types::{
    FailureStrategy, FlowSpec, FlowState, StepAction, StepParams, StepSpec,
    DEFAULT_STORAGE_CLEAR_SCRIPT,
};
