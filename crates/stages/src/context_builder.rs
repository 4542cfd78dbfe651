//! ContextBuilder (spec §4.5 Mode A step 1).
//!
//! Builds a `ConversationContext` by asking the LLM to summarise the
//! conversation so far. Failure here is the pipeline's designated
//! soft-fail point: callers are expected to fall back to
//! `ConversationContext::unavailable_default()` rather than abort the
//! request.

use std::sync::Arc;

use chatcoach_llm::{LlmCall, LlmRouter, Quality, TaskType};
use chatcoach_prompt::extract::extract_json;
use chatcoach_prompt::types::{EmotionState, Message};
use chatcoach_prompt::ConversationContext;

pub struct ContextBuilder {
    llm: Arc<LlmRouter>,
}

impl ContextBuilder {
    pub fn new(llm: Arc<LlmRouter>) -> Self {
        Self { llm }
    }

    fn build_prompt(conversation: &[Message]) -> String {
        let history = conversation
            .iter()
            .map(|m| format!("{}: {}", m.speaker, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Summarise this conversation and infer the end-user's current emotional state \
             and intimacy level (0-100).\n\n{history}\n\n\
             Respond with JSON only: {{\"summary\":\"...\",\"emotion_state\":\"positive|neutral|negative|tense\",\"intimacy_level\":0-100,\"risk_flags\":[]}}"
        )
    }

    pub async fn build(&self, conversation: &[Message], user_id: &str) -> anyhow::Result<ConversationContext> {
        let prompt = Self::build_prompt(conversation);
        let call = LlmCall::new(TaskType::Scene, prompt, Quality::Cheap, user_id);
        let result = self.llm.call(call).await?;
        let value = extract_json(&result.text)?;

        let emotion_state = match value["emotion_state"].as_str().unwrap_or("neutral") {
            "positive" => EmotionState::Positive,
            "negative" => EmotionState::Negative,
            "tense" => EmotionState::Tense,
            _ => EmotionState::Neutral,
        };

        Ok(ConversationContext {
            summary: value["summary"].as_str().unwrap_or_default().to_string(),
            emotion_state,
            current_intimacy_level: value["intimacy_level"].as_u64().unwrap_or(50).min(100) as u8,
            risk_flags: value["risk_flags"]
                .as_array()
                .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            conversation: conversation.to_vec(),
            history_summary: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatcoach_llm::{LlmError, LlmResult, ProviderClient};

    struct StubProvider;

    #[async_trait]
    impl ProviderClient for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }
        async fn complete(&self, _call: &LlmCall, _model: &str) -> Result<LlmResult, LlmError> {
            Ok(LlmResult {
                text: r#"{"summary":"flirty banter","emotion_state":"positive","intimacy_level":35,"risk_flags":[]}"#.to_string(),
                provider: "stub".to_string(),
                model: "stub-model".to_string(),
                input_tokens: 10,
                output_tokens: 5,
                cost_usd: 0.0,
                latency_ms: 1,
            })
        }
    }

    fn router() -> Arc<LlmRouter> {
        use chatcoach_llm::{ProviderCandidate, ProviderTier};
        Arc::new(LlmRouter::new(
            vec![Arc::new(StubProvider)],
            vec![(ProviderTier::Low, vec![ProviderCandidate::new("stub", "stub-model")])],
            std::time::Duration::from_secs(60),
            ProviderCandidate::new("stub", "stub-model"),
        ))
    }

    #[tokio::test]
    async fn builds_context_from_llm_json() {
        let builder = ContextBuilder::new(router());
        let conversation = vec![Message { id: "1".into(), speaker: "talker".into(), content: "hey cutie".into(), timestamp: None }];
        let context = builder.build(&conversation, "u1").await.unwrap();
        assert_eq!(context.summary, "flirty banter");
        assert_eq!(context.emotion_state, EmotionState::Positive);
        assert_eq!(context.current_intimacy_level, 35);
    }
}
