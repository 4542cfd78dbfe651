//! Local lexical intimacy evaluator.
//!
//! Grounded on the teacher's `crates/memory/src/sentiment.rs` keyword-bucket
//! + negation-lookback scorer, repurposed from valence to escalation level:
//! instead of positive/negative words we score against intimacy-escalation
//! vocabulary buckets (tone, physical, commitment) and report each as a
//! 0-100 level.

use async_trait::async_trait;

use chatcoach_prompt::types::{ConversationContext, SceneAnalysisResult};

use super::{Decision, EvaluatorVerdict, IntimacyEvaluator};

const TONE_WORDS: &[&str] = &["cute", "sweet", "miss you", "thinking of you", "adorable", "charming"];
const PHYSICAL_WORDS: &[&str] = &["kiss", "hug", "hold you", "in bed", "touch", "cuddle"];
const COMMITMENT_WORDS: &[&str] = &["love you", "marry", "forever", "my girlfriend", "my boyfriend", "soulmate"];

fn bucket_level(lower: &str, words: &[&str]) -> u8 {
    let hits = words.iter().filter(|w| lower.contains(*w)).count();
    (hits as u32 * 30).min(100) as u8
}

/// Negation handling mirrors `sentiment::infer_valence`'s intent, relaxed
/// to phrase level: a candidate containing both a negation token and a
/// bucket word is treated as half-weight, since "not trying to kiss you"
/// is a much weaker escalation signal than "trying to kiss you".
fn negated_bucket_level(content: &str, words: &[&str]) -> u8 {
    let lower = content.to_lowercase();
    let level = bucket_level(&lower, words);
    let negated = ["not", "no", "never", "without"].iter().any(|neg| lower.contains(neg));
    if negated {
        (level as f32 * 0.5) as u8
    } else {
        level
    }
}

#[derive(Default)]
pub struct LocalLexicalEvaluator;

#[async_trait]
impl IntimacyEvaluator for LocalLexicalEvaluator {
    async fn evaluate(
        &self,
        candidate: &str,
        target_intimacy: u8,
        _persona_prompt: &str,
        _scene: &SceneAnalysisResult,
        _context: &ConversationContext,
    ) -> anyhow::Result<EvaluatorVerdict> {
        let tone = negated_bucket_level(candidate, TONE_WORDS);
        let physical = negated_bucket_level(candidate, PHYSICAL_WORDS);
        let commitment = negated_bucket_level(candidate, COMMITMENT_WORDS);

        let max_level = tone.max(physical).max(commitment);
        let decision = if max_level > target_intimacy.saturating_add(40) { Decision::Fail } else { Decision::Pass };

        Ok(EvaluatorVerdict { decision, per_dimension_levels: vec![tone, physical, commitment] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatcoach_prompt::types::{EmotionState, RelationshipState, Scenario};

    fn scene() -> SceneAnalysisResult {
        SceneAnalysisResult {
            relationship_state: RelationshipState::Ignition,
            scenario: Scenario::Safe,
            intimacy_level: 10,
            current_scenario: Scenario::Safe,
            recommended_scenario: Scenario::Safe,
            recommended_strategies: vec![],
            risk_flags: vec![],
        }
    }

    fn context() -> ConversationContext {
        ConversationContext {
            summary: String::new(),
            emotion_state: EmotionState::Neutral,
            current_intimacy_level: 10,
            risk_flags: vec![],
            conversation: vec![],
            history_summary: None,
        }
    }

    #[tokio::test]
    async fn mild_tone_scores_low_across_dimensions() {
        let evaluator = LocalLexicalEvaluator;
        let verdict = evaluator.evaluate("You're pretty cute, how's your day going?", 10, "", &scene(), &context()).await.unwrap();
        assert_eq!(verdict.decision, Decision::Pass);
        assert!(verdict.per_dimension_levels[1] == 0, "no physical-escalation words present");
    }

    #[tokio::test]
    async fn commitment_language_scores_high_on_that_dimension() {
        let evaluator = LocalLexicalEvaluator;
        let verdict = evaluator.evaluate("I think I love you, will you marry me?", 10, "", &scene(), &context()).await.unwrap();
        assert!(verdict.per_dimension_levels[2] >= 30);
    }

    #[tokio::test]
    async fn negated_physical_mention_scores_lower_than_unnegated() {
        let evaluator = LocalLexicalEvaluator;
        let negated = evaluator.evaluate("I am not trying to kiss you tonight", 10, "", &scene(), &context()).await.unwrap();
        let plain = evaluator.evaluate("I want to kiss you tonight", 10, "", &scene(), &context()).await.unwrap();
        assert!(negated.per_dimension_levels[1] < plain.per_dimension_levels[1]);
    }
}
