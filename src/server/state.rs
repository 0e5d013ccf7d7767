use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::request::RequestDefaults;
use crate::supervisor::FlowRunner;

#[derive(Clone)]
pub struct ServeState {
    pub runner: Arc<dyn FlowRunner>,
    pub defaults: RequestDefaults,
    pub health: Arc<ServeHealth>,
}

impl ServeState {
    pub fn new(runner: Arc<dyn FlowRunner>, defaults: RequestDefaults) -> Self {
        Self {
            runner,
            defaults,
            health: Arc::new(ServeHealth::new()),
        }
    }

    pub fn health_snapshot(&self) -> HealthSnapshot {
        self.health.snapshot()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub in_flight: u64,
    pub completed: u64,
    pub succeeded: u64,
}

/// Run counters reported by `/health`
#[derive(Default)]
pub struct ServeHealth {
    in_flight: AtomicU64,
    completed: AtomicU64,
    succeeded: AtomicU64,
}

impl ServeHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn run_finished(&self, success: bool) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        if success {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            in_flight: self.in_flight.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
        }
    }
}
