//! Scene=2 path (spec §4.6 step 3): text Q&A is a single adapter call with
//! no stage pipeline at all — no context/scene/persona/retry, just
//! `suggested_replies[0]`.

use chatcoach_llm::{LlmCall, LlmResult, Quality, TaskType};

use crate::error::OrchestratorError;
use crate::mode_a::Orchestrator;

impl Orchestrator {
    pub async fn run_text_qa(&self, prompt: String, user_id: &str) -> Result<LlmResult, OrchestratorError> {
        let call = LlmCall::new(TaskType::Generation, prompt, Quality::Normal, user_id);
        Ok(self.llm().call(call).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chatcoach_audit::NullAuditSink;
    use chatcoach_collab::StubProfileFacade;
    use chatcoach_config::{OrchestratorConfig, PromptConfig};
    use chatcoach_llm::{LlmError, LlmRouter, ProviderCandidate, ProviderClient, ProviderTier};
    use chatcoach_prompt::types::{ConversationContext, SceneAnalysisResult};
    use chatcoach_stages::{Decision, EvaluatorVerdict, IntimacyEvaluator};

    struct EchoProvider;

    #[async_trait]
    impl ProviderClient for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }
        async fn complete(&self, call: &LlmCall, model: &str) -> Result<LlmResult, LlmError> {
            Ok(LlmResult {
                text: format!("echo:{}", call.prompt),
                provider: "echo".to_string(),
                model: model.to_string(),
                input_tokens: 1,
                output_tokens: 1,
                cost_usd: 0.0,
                latency_ms: 1,
            })
        }
    }

    struct AlwaysPass;

    #[async_trait]
    impl IntimacyEvaluator for AlwaysPass {
        async fn evaluate(
            &self,
            _candidate: &str,
            _target_intimacy: u8,
            _persona_prompt: &str,
            _scene: &SceneAnalysisResult,
            _context: &ConversationContext,
        ) -> anyhow::Result<EvaluatorVerdict> {
            Ok(EvaluatorVerdict { decision: Decision::Pass, per_dimension_levels: vec![0] })
        }
    }

    #[tokio::test]
    async fn text_qa_makes_a_single_call_and_returns_raw_text() {
        let router = Arc::new(LlmRouter::new(
            vec![Arc::new(EchoProvider)],
            vec![(ProviderTier::Medium, vec![ProviderCandidate::new("echo", "m1")])],
            std::time::Duration::from_secs(60),
            ProviderCandidate::new("echo", "m1"),
        ));
        let orchestrator = Orchestrator::new(
            router,
            Arc::new(StubProfileFacade),
            Arc::new(AlwaysPass),
            Arc::new(NullAuditSink),
            PromptConfig::default(),
            OrchestratorConfig::default(),
            true,
            "reply_v1",
        );
        let result = orchestrator.run_text_qa("what's up?".to_string(), "u1").await.unwrap();
        assert_eq!(result.text, "echo:what's up?");
    }
}
