//! Orchestrator-local error taxonomy (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("merge_step_parse_failed: {preview}")]
    MergeStepParseFailed { preview: String },

    #[error(transparent)]
    Llm(#[from] chatcoach_llm::LlmError),
}
