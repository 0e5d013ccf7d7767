//! HTTP façade: one isolated run per accepted request

mod router;
mod state;

pub use router::build_router;
pub use state::{HealthSnapshot, ServeHealth, ServeState};
