//! Scene-indexed fallback templates, the last line of defence when every
//! reply-generation attempt fails its intimacy check (spec §4.5.2).

use chatcoach_llm::LlmResult;
use chatcoach_prompt::types::RelationshipState;

pub fn fallback_text(relationship_state: Option<RelationshipState>) -> &'static str {
    match relationship_state {
        Some(RelationshipState::Ignition) => "Hey, what's been the best part of your day?",
        Some(RelationshipState::Propulsion) => "That's really interesting, tell me more!",
        Some(RelationshipState::Ventilation) => "I hear you, let's slow down for a moment.",
        Some(RelationshipState::Equilibrium) => "Sounds good.",
        None => "Okay, I understand.",
    }
}

/// A zero-cost `LLMResult` attributed to `fallback`/`template` (spec §4.5.2).
pub fn fallback_result(relationship_state: Option<RelationshipState>) -> LlmResult {
    LlmResult::fallback_template(fallback_text(relationship_state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_relationship_state_has_a_distinct_template() {
        let templates: Vec<&str> = [
            Some(RelationshipState::Ignition),
            Some(RelationshipState::Propulsion),
            Some(RelationshipState::Ventilation),
            Some(RelationshipState::Equilibrium),
            None,
        ]
        .into_iter()
        .map(fallback_text)
        .collect();

        let unique: std::collections::HashSet<&&str> = templates.iter().collect();
        assert_eq!(unique.len(), templates.len());
    }

    #[test]
    fn fallback_result_carries_zero_cost_and_template_provider() {
        let result = fallback_result(Some(RelationshipState::Equilibrium));
        assert_eq!(result.provider, "fallback");
        assert_eq!(result.model, "template");
        assert_eq!(result.cost_usd, 0.0);
        assert_eq!(result.input_tokens, 0);
        assert_eq!(result.output_tokens, 0);
    }
}
