//! Intimacy Checker (spec §4.7).
//!
//! Pluggable evaluator behind a small trait, mirroring the teacher's `Tool`
//! trait shape (spec + run, implementation swappable). Implementations:
//! a local lexical scorer (preferred when available), an HTTP moderation
//! endpoint (fallback), and a prompt-based LLM scorer (used when a
//! third-party adapter is configured).

mod http;
mod llm;
mod local;

pub use http::HttpModerationEvaluator;
pub use llm::LlmPromptEvaluator;
pub use local::LocalLexicalEvaluator;

use async_trait::async_trait;

use chatcoach_prompt::types::{ConversationContext, IntimacyCheckResult, IntimacyStage, SceneAnalysisResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Fail,
}

/// Raw verdict from an evaluator before the stage-boundary decision rule is
/// applied. `per_dimension_levels` are 0-100 intimacy-equivalent levels, one
/// per scored dimension (tone, physical escalation, commitment language, …).
#[derive(Debug, Clone)]
pub struct EvaluatorVerdict {
    pub decision: Decision,
    pub per_dimension_levels: Vec<u8>,
}

#[async_trait]
pub trait IntimacyEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        candidate: &str,
        target_intimacy: u8,
        persona_prompt: &str,
        scene: &SceneAnalysisResult,
        context: &ConversationContext,
    ) -> anyhow::Result<EvaluatorVerdict>;
}

/// Wraps an `IntimacyEvaluator` with the stage-boundary decision rule and
/// the `fail_open` policy (spec §4.7).
pub struct IntimacyChecker {
    evaluator: std::sync::Arc<dyn IntimacyEvaluator>,
    fail_open: bool,
}

impl IntimacyChecker {
    pub fn new(evaluator: std::sync::Arc<dyn IntimacyEvaluator>, fail_open: bool) -> Self {
        Self { evaluator, fail_open }
    }

    /// Pass iff the evaluator returns `Decision::Pass` *and* no per-dimension
    /// score maps to a stage >= 2 above the target intimacy stage. On any
    /// evaluator error, `fail_open` decides the outcome.
    pub async fn check(
        &self,
        candidate: &str,
        target_intimacy: u8,
        persona_prompt: &str,
        scene: &SceneAnalysisResult,
        context: &ConversationContext,
    ) -> IntimacyCheckResult {
        match self.evaluator.evaluate(candidate, target_intimacy, persona_prompt, scene, context).await {
            Ok(verdict) => self.apply_decision_rule(verdict, target_intimacy),
            Err(err) => {
                tracing::warn!(error = %err, fail_open = self.fail_open, "intimacy evaluator unavailable");
                IntimacyCheckResult {
                    passed: self.fail_open,
                    score: if self.fail_open { 1.0 } else { 0.0 },
                    per_dimension_scores: vec![],
                    reason: Some("moderation_unavailable".to_string()),
                }
            }
        }
    }

    fn apply_decision_rule(&self, verdict: EvaluatorVerdict, target_intimacy: u8) -> IntimacyCheckResult {
        let target_stage = IntimacyStage::from_level(target_intimacy).ordinal();

        let per_dimension_scores: Vec<f32> = verdict.per_dimension_levels.iter().map(|&level| level as f32 / 100.0).collect();

        let any_dimension_too_high = verdict
            .per_dimension_levels
            .iter()
            .any(|&level| IntimacyStage::from_level(level).ordinal() - target_stage >= 2);

        let passed = verdict.decision == Decision::Pass && !any_dimension_too_high;
        let score = per_dimension_scores.iter().copied().fold(0.0_f32, f32::max);

        IntimacyCheckResult {
            passed,
            score,
            per_dimension_scores,
            reason: if any_dimension_too_high { Some("dimension_exceeds_target_stage".to_string()) } else { None },
        }
    }
}
