//! Stage-local error taxonomy (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("reply_parse_failed: {preview}")]
    ReplyParseFailed { preview: String },

    #[error(transparent)]
    Llm(#[from] chatcoach_llm::LlmError),
}
