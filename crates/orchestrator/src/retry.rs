//! Retry-seed perturbation for reply generation (spec §4.5.1).
//!
//! On a failed intimacy check, the next attempt drops the top strategy
//! weight and boosts the second, nudges the scenario toward "safer"
//! templates, and shrinks the reply-length budget. The target intimacy is
//! never perturbed — only the orchestrator's caller ever changes it.

use chatcoach_prompt::types::{Scenario, StrategyPlan};

pub struct RetrySeed {
    pub plan: StrategyPlan,
    /// Scenario override: SAFE on the second attempt, RECOVERY from the
    /// third attempt onward.
    pub scenario_override: Scenario,
    /// Multiplier applied to the quality tier's `max_reply_tokens` budget.
    pub max_tokens_scale: f32,
}

/// `attempt_number` is the attempt about to run (2, 3, ...); there is no
/// seed for attempt 1, which uses the plan as produced by the planner.
pub fn perturb_for_retry(plan: &StrategyPlan, attempt_number: u32) -> RetrySeed {
    let mut weights = plan.strategy_weights.clone();
    weights.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    if weights.len() >= 2 {
        let top_weight = weights[0].1;
        weights[0].1 = 0.0;
        weights[1].1 = (weights[1].1 + top_weight * 0.5).min(1.0);
    }

    let scenario_override = if attempt_number >= 3 { Scenario::Recovery } else { Scenario::Safe };
    let max_tokens_scale = 0.75_f32.powi(attempt_number.saturating_sub(1) as i32);

    RetrySeed {
        plan: StrategyPlan {
            recommended_scenario: scenario_override,
            strategy_weights: weights,
            avoid_strategies: plan.avoid_strategies.clone(),
        },
        scenario_override,
        max_tokens_scale,
    }
}
