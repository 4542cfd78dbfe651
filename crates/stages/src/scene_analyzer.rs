//! SceneAnalyzer (spec §4.5 Mode A step 2).

use std::sync::Arc;

use chatcoach_llm::{LlmCall, LlmRouter, Quality, TaskType};
use chatcoach_prompt::codec::expand_scene_analysis;
use chatcoach_prompt::extract::extract_json;
use chatcoach_prompt::types::{ConversationContext, IntimacyStage, SceneAnalysisResult};

pub struct SceneAnalyzer {
    llm: Arc<LlmRouter>,
}

impl SceneAnalyzer {
    pub fn new(llm: Arc<LlmRouter>) -> Self {
        Self { llm }
    }

    fn build_prompt(context: &ConversationContext, target_intimacy: u8) -> String {
        format!(
            "Conversation summary: {}\nInferred intimacy: {}\nRequested target intimacy: {target_intimacy}\n\
             Analyse the relationship scene. \
             Respond with JSON only: {{\"rs\":\"I|P|V|E\",\"sc\":\"S|B|R|C|N\",\"il\":{target_intimacy},\
             \"cs\":\"S|B|R|C|N\",\"rc\":\"S|B|R|C|N\",\"st\":[\"strategy\", ...],\"rf\":[]}}",
            context.summary, context.current_intimacy_level,
        )
    }

    pub async fn analyze(
        &self,
        context: &ConversationContext,
        target_intimacy: u8,
        user_id: &str,
    ) -> anyhow::Result<SceneAnalysisResult> {
        let prompt = Self::build_prompt(context, target_intimacy);
        let call = LlmCall::new(TaskType::Scene, prompt, Quality::Normal, user_id);
        let result = self.llm.call(call).await?;
        let value = extract_json(&result.text)?;
        Ok(expand_scene_analysis(&value))
    }
}

/// Compares requested vs inferred intimacy stage and derives risk flags
/// (spec §4.5 Mode A step 2).
pub fn derive_risk_flags(target_level: u8, inferred_level: u8) -> Vec<String> {
    let target_stage = IntimacyStage::from_level(target_level).ordinal();
    let inferred_stage = IntimacyStage::from_level(inferred_level).ordinal();
    let delta = target_stage - inferred_stage;

    let mut flags = Vec::new();
    if delta >= 2 {
        flags.push("overly_high_expectation".to_string());
    } else if delta <= -2 {
        flags.push("cool_down_required".to_string());
    }
    flags
}
