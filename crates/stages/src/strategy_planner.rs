//! StrategyPlanner (spec §4.5 Mode A step 3).
//!
//! If the LLM-driven plan call fails, synthesises a fallback plan from the
//! scene's recommended strategies with linearly decreasing weights.

use std::sync::Arc;

use chatcoach_llm::{LlmCall, LlmRouter, Quality, TaskType};
use chatcoach_prompt::extract::extract_json;
use chatcoach_prompt::types::{SceneAnalysisResult, StrategyPlan};

pub struct StrategyPlanner {
    llm: Arc<LlmRouter>,
}

impl StrategyPlanner {
    pub fn new(llm: Arc<LlmRouter>) -> Self {
        Self { llm }
    }

    fn build_prompt(scene: &SceneAnalysisResult) -> String {
        format!(
            "Recommended scenario: {:?}\nCandidate strategies: {}\n\
             Produce a compact strategy plan. \
             Respond with JSON only: {{\"weights\":{{\"strategy_name\":0.0-1.0, ...}},\"avoid\":[]}}",
            scene.recommended_scenario,
            scene.recommended_strategies.join(", "),
        )
    }

    /// Never fails: on LLM or parse error, falls back to
    /// `synthesize_fallback` (spec §4.5 step 3).
    pub async fn plan(&self, scene: &SceneAnalysisResult, user_id: &str) -> StrategyPlan {
        match self.try_plan(scene, user_id).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(error = %err, "strategy planner failed, synthesising fallback plan");
                synthesize_fallback(scene)
            }
        }
    }

    async fn try_plan(&self, scene: &SceneAnalysisResult, user_id: &str) -> anyhow::Result<StrategyPlan> {
        let prompt = Self::build_prompt(scene);
        let call = LlmCall::new(TaskType::StrategyPlanning, prompt, Quality::Cheap, user_id);
        let result = self.llm.call(call).await?;
        let value = extract_json(&result.text)?;

        let strategy_weights = value["weights"]
            .as_object()
            .map(|obj| {
                obj.iter()
                    .map(|(name, weight)| (name.clone(), weight.as_f64().unwrap_or(0.0) as f32))
                    .take(10)
                    .collect::<Vec<_>>()
            })
            .filter(|weights: &Vec<(String, f32)>| !weights.is_empty())
            .ok_or_else(|| anyhow::anyhow!("strategy planner returned no weights"))?;

        let avoid_strategies = value["avoid"]
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        Ok(StrategyPlan { recommended_scenario: scene.recommended_scenario, strategy_weights, avoid_strategies })
    }
}

/// Linearly decreasing weights (1.0, 0.9, 0.8, ...) over the scene's
/// recommended strategies (spec §4.5 step 3).
pub fn synthesize_fallback(scene: &SceneAnalysisResult) -> StrategyPlan {
    let strategy_weights = scene
        .recommended_strategies
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), (1.0 - 0.1 * i as f32).max(0.0)))
        .collect();

    StrategyPlan { recommended_scenario: scene.recommended_scenario, strategy_weights, avoid_strategies: vec![] }
}
