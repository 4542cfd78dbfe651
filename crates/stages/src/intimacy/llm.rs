//! Prompt-based LLM intimacy scorer — used when a third-party adapter is
//! configured in place of the local/HTTP evaluators (spec §4.7).

use std::sync::Arc;

use async_trait::async_trait;

use chatcoach_llm::{LlmCall, LlmRouter, Quality, TaskType};
use chatcoach_prompt::extract::extract_json;
use chatcoach_prompt::types::{ConversationContext, SceneAnalysisResult};

use super::{Decision, EvaluatorVerdict, IntimacyEvaluator};

pub struct LlmPromptEvaluator {
    llm: Arc<LlmRouter>,
}

impl LlmPromptEvaluator {
    pub fn new(llm: Arc<LlmRouter>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntimacyEvaluator for LlmPromptEvaluator {
    async fn evaluate(
        &self,
        candidate: &str,
        target_intimacy: u8,
        persona_prompt: &str,
        scene: &SceneAnalysisResult,
        _context: &ConversationContext,
    ) -> anyhow::Result<EvaluatorVerdict> {
        let prompt = format!(
            "Persona: {persona_prompt}\nScene scenario: {:?}\nTarget intimacy level (0-100): {target_intimacy}\n\
             Candidate reply: \"{candidate}\"\n\
             Score how intimate this reply reads on a 0-100 scale across tone, physical, and commitment \
             dimensions, and decide pass/fail against the target. \
             Respond with JSON only: {{\"decision\":\"pass|fail\",\"levels\":[tone, physical, commitment]}}",
            scene.scenario,
        );

        let call = LlmCall::new(TaskType::Qc, prompt, Quality::Cheap, "system");
        let result = self.llm.call(call).await?;
        let value = extract_json(&result.text)?;

        let decision = if value["decision"].as_str().unwrap_or("fail").eq_ignore_ascii_case("pass") {
            Decision::Pass
        } else {
            Decision::Fail
        };

        let per_dimension_levels = value["levels"]
            .as_array()
            .map(|items| items.iter().map(|v| v.as_u64().unwrap_or(0).min(100) as u8).collect())
            .unwrap_or_default();

        Ok(EvaluatorVerdict { decision, per_dimension_levels })
    }
}
