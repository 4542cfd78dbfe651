//! Prompt assembly from request-scoped inputs (spec §4.3).
//!
//! Grounded on `crates/runtime/src/prompt_builder.rs`'s named-block `format!`
//! assembly and `truncate_for_prompt` helper, generalised to this system's
//! flags (`use_compact_prompt`, `use_compact_v2`, `include_reasoning`) and
//! quality-tier token budgets.

use chatcoach_config::PromptConfig;
use chatcoach_llm::Quality;

use crate::types::{ConversationContext, Message, PersonaSnapshot, StrategyPlan};

const MAX_PROFILE_SUMMARY_CHARS: usize = 200;

fn truncate_for_prompt(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let truncated: String = text.chars().take(limit).collect();
    format!("{truncated}...")
}

/// Inputs available when building a reply-generation prompt.
pub struct ReplyPromptInputs<'a> {
    pub context: &'a ConversationContext,
    pub plan: Option<&'a StrategyPlan>,
    pub persona: &'a PersonaSnapshot,
    pub target_intimacy: u8,
    pub prompt_version_name: &'a str,
}

pub struct PromptAssembler<'a> {
    config: &'a PromptConfig,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(config: &'a PromptConfig) -> Self {
        Self { config }
    }

    fn last_message<'m>(&self, conversation: &'m [Message]) -> Option<&'m Message> {
        conversation.last()
    }

    fn build_history_block(&self, conversation: &[Message]) -> String {
        if self.config.use_compact_prompt {
            return self
                .last_message(conversation)
                .map(|m| format!("Last message ({}): {}", m.speaker, m.content))
                .unwrap_or_default();
        }

        conversation
            .iter()
            .map(|m| format!("{}: {}", m.speaker, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn build_profile_block(&self, persona: &PersonaSnapshot) -> String {
        if self.config.use_compact_prompt {
            return truncate_for_prompt(&persona.style, MAX_PROFILE_SUMMARY_CHARS);
        }
        format!(
            "Style: {}\nPacing: {:?}\nRisk tolerance: {:?}\nConfidence: {:.2}",
            persona.style, persona.pacing, persona.risk_tolerance, persona.confidence
        )
    }

    fn build_strategy_block(&self, plan: Option<&StrategyPlan>) -> String {
        let Some(plan) = plan else {
            return String::new();
        };
        let top = plan.top_strategies(3);
        if top.is_empty() {
            return String::new();
        }
        format!("Consider these strategies (highest weight first): {}", top.join(", "))
    }

    fn output_schema_instruction(&self) -> &'static str {
        if self.config.use_compact_v2 {
            r#"Respond with JSON only: {"r":[["reply text","strategy_code"]],"adv":"one-line advice"}"#
        } else {
            r#"Respond with JSON only: {"replies":[{"text":"reply text","strategy":"strategy_code"}],"overall_advice":"one-line advice"}"#
        }
    }

    fn length_constraint(&self, quality: Quality) -> String {
        format!("Length Constraint: keep each reply under {} tokens.", quality.max_reply_tokens())
    }

    /// Builds the reply-generation prompt. When `use_compact_v2` is set, a
    /// `[PROMPT:<name>]` tag prefix is emitted so replies can be traced back
    /// to a concrete prompt version.
    pub fn build_reply_prompt(&self, inputs: &ReplyPromptInputs<'_>, quality: Quality) -> String {
        let mut blocks = Vec::new();

        if self.config.use_compact_v2 {
            blocks.push(format!("[PROMPT:{}]", inputs.prompt_version_name));
        }

        blocks.push(format!("Conversation summary: {}", inputs.context.summary));
        blocks.push(self.build_history_block(&inputs.context.conversation));
        blocks.push(format!("Persona: {}", self.build_profile_block(inputs.persona)));

        let strategy_block = self.build_strategy_block(inputs.plan);
        if !strategy_block.is_empty() {
            blocks.push(strategy_block);
        }

        blocks.push(format!("Target intimacy level: {}", inputs.target_intimacy));
        blocks.push(self.length_constraint(quality).to_string());

        if self.config.include_reasoning {
            blocks.push("Include a short one-sentence reasoning per reply.".to_string());
        }

        blocks.push(self.output_schema_instruction().to_string());

        blocks.into_iter().filter(|b| !b.is_empty()).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmotionState, Pacing, RiskTolerance, Scenario};

    fn sample_context() -> ConversationContext {
        ConversationContext {
            summary: "getting to know each other".to_string(),
            emotion_state: EmotionState::Positive,
            current_intimacy_level: 30,
            risk_flags: vec![],
            conversation: vec![
                Message { id: "1".into(), speaker: "talker".into(), content: "hey".into(), timestamp: None },
                Message { id: "2".into(), speaker: "user".into(), content: "how's your day?".into(), timestamp: None },
            ],
            history_summary: None,
        }
    }

    fn sample_persona() -> PersonaSnapshot {
        PersonaSnapshot {
            style: "warm and curious".to_string(),
            pacing: Pacing::Normal,
            risk_tolerance: RiskTolerance::Medium,
            confidence: 0.8,
            prompt: String::new(),
        }
    }

    fn sample_plan() -> StrategyPlan {
        StrategyPlan {
            recommended_scenario: Scenario::Balanced,
            strategy_weights: vec![
                ("emotional_resonance".to_string(), 0.9),
                ("curiosity_hook".to_string(), 0.6),
                ("playful_tease".to_string(), 0.4),
                ("mirroring".to_string(), 0.1),
            ],
            avoid_strategies: vec![],
        }
    }

    #[test]
    fn compact_prompt_uses_last_message_only() {
        let config = PromptConfig { use_compact_prompt: true, ..Default::default() };
        let assembler = PromptAssembler::new(&config);
        let context = sample_context();
        let block = assembler.build_history_block(&context.conversation);
        assert!(block.contains("how's your day?"));
        assert!(!block.contains("hey"));
    }

    #[test]
    fn verbose_prompt_includes_full_history() {
        let config = PromptConfig { use_compact_prompt: false, ..Default::default() };
        let assembler = PromptAssembler::new(&config);
        let context = sample_context();
        let block = assembler.build_history_block(&context.conversation);
        assert!(block.contains("hey"));
        assert!(block.contains("how's your day?"));
    }

    #[test]
    fn compact_v2_adds_prompt_tag_and_compact_schema() {
        let config = PromptConfig { use_compact_v2: true, ..Default::default() };
        let assembler = PromptAssembler::new(&config);
        let plan = sample_plan();
        let inputs = ReplyPromptInputs {
            context: &sample_context(),
            plan: Some(&plan),
            persona: &sample_persona(),
            target_intimacy: 30,
            prompt_version_name: "reply_v3",
        };
        let prompt = assembler.build_reply_prompt(&inputs, Quality::Normal);
        assert!(prompt.starts_with("[PROMPT:reply_v3]"));
        assert!(prompt.contains(r#"{"r":"#));
    }

    #[test]
    fn only_top_three_strategies_are_rendered() {
        let config = PromptConfig::default();
        let assembler = PromptAssembler::new(&config);
        let plan = sample_plan();
        let inputs = ReplyPromptInputs {
            context: &sample_context(),
            plan: Some(&plan),
            persona: &sample_persona(),
            target_intimacy: 30,
            prompt_version_name: "reply_v3",
        };
        let prompt = assembler.build_reply_prompt(&inputs, Quality::Normal);
        assert!(prompt.contains("emotional_resonance"));
        assert!(prompt.contains("curiosity_hook"));
        assert!(prompt.contains("playful_tease"));
        assert!(!prompt.contains("mirroring"));
    }

    #[test]
    fn length_constraint_follows_quality_tier() {
        let config = PromptConfig::default();
        let assembler = PromptAssembler::new(&config);
        assert!(assembler.length_constraint(Quality::Cheap).contains("50 tokens"));
        assert!(assembler.length_constraint(Quality::Premium).contains("200 tokens"));
    }
}
