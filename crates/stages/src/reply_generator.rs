//! ReplyGenerator (spec §4.5 Mode A step 5, first half — generation only;
//! retry/seed-perturbation and the intimacy-check gate live in the
//! orchestrator, which drives this stage repeatedly).

use std::sync::Arc;

use chatcoach_llm::{LlmCall, LlmResult, LlmRouter, Quality, TaskType};
use chatcoach_prompt::codec::parse_generation_output;
use chatcoach_prompt::extract::extract_json;
use chatcoach_prompt::types::GenerationOutput;

use crate::error::StageError;

pub struct ReplyGenerator {
    llm: Arc<LlmRouter>,
}

impl ReplyGenerator {
    pub fn new(llm: Arc<LlmRouter>) -> Self {
        Self { llm }
    }

    /// Returns the parsed output alongside the raw `LlmResult` so callers can
    /// track accounting (cost cap, audit) for the underlying call.
    pub async fn generate(
        &self,
        prompt: String,
        quality: Quality,
        user_id: &str,
        max_tokens: Option<u32>,
    ) -> Result<(GenerationOutput, LlmResult), StageError> {
        let mut call = LlmCall::new(TaskType::Generation, prompt, quality, user_id);
        call.max_tokens = max_tokens.or(Some(quality.max_reply_tokens()));

        let result = self.llm.call(call).await?;
        let preview = || result.text.chars().take(200).collect::<String>();

        let value = extract_json(&result.text).map_err(|_| StageError::ReplyParseFailed { preview: preview() })?;
        let output = parse_generation_output(&value).ok_or_else(|| StageError::ReplyParseFailed { preview: preview() })?;
        Ok((output, result))
    }
}
