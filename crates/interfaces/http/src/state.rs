use std::sync::Arc;

use chatcoach_coordinator::PredictCoordinator;

use crate::metrics::Metrics;

/// Shared state handed to every handler (spec §6.1-6.2). Construction lives
/// in `main.rs`; this crate only ever consumes an already-wired coordinator.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<PredictCoordinator>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(coordinator: Arc<PredictCoordinator>) -> Self {
        Self { coordinator, metrics: Arc::new(Metrics::new()) }
    }
}
