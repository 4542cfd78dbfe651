//! Drives the six-stage reasoning pipeline with retry, fallback, cost-cap,
//! and merge-step execution modes (spec §4.5, C8).

mod attempt;
mod error;
mod fallback;
mod mode_a;
mod mode_b;
mod qa;
mod retry;

pub use attempt::AttemptState;
pub use error::OrchestratorError;
pub use fallback::{fallback_result, fallback_text};
pub use mode_a::{ModeAOutcome, ModeARequest, Orchestrator};
pub use mode_b::{ModeBRequest, NormalizedBbox, ParsedDialog};
pub use retry::{perturb_for_retry, RetrySeed};
