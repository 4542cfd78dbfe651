//! Domain types shared by every stage of the pipeline (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmotionState {
    Positive,
    Neutral,
    Negative,
    Tense,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Scenario {
    Safe,
    Balanced,
    Risky,
    Recovery,
    Negative,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelationshipState {
    Ignition,
    Propulsion,
    Ventilation,
    Equilibrium,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Pacing {
    Slow,
    Normal,
    Fast,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

/// 0-100 intimacy score cut into five stages at 20/40/60/80 (spec GLOSSARY).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntimacyStage {
    Stranger,
    Acquaintance,
    Friend,
    Intimate,
    Bonded,
}

impl IntimacyStage {
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=20 => IntimacyStage::Stranger,
            21..=40 => IntimacyStage::Acquaintance,
            41..=60 => IntimacyStage::Friend,
            61..=80 => IntimacyStage::Intimate,
            _ => IntimacyStage::Bonded,
        }
    }

    pub fn ordinal(self) -> i32 {
        match self {
            IntimacyStage::Stranger => 0,
            IntimacyStage::Acquaintance => 1,
            IntimacyStage::Friend => 2,
            IntimacyStage::Intimate => 3,
            IntimacyStage::Bonded => 4,
        }
    }
}

/// Raw speaker label as it arrives on the wire; `user`/`self` are the
/// end-user, `talker`/`other`/`left` are the counterpart, anything else is
/// treated as counterpart (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub speaker: String,
    pub content: String,
    pub timestamp: Option<String>,
}

impl Message {
    pub fn is_end_user(&self) -> bool {
        matches!(self.speaker.as_str(), "user" | "self")
    }

    pub fn is_counterpart(&self) -> bool {
        !self.is_end_user()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub summary: String,
    pub emotion_state: EmotionState,
    pub current_intimacy_level: u8,
    pub risk_flags: Vec<String>,
    pub conversation: Vec<Message>,
    pub history_summary: Option<String>,
}

impl ConversationContext {
    /// The designated soft-fail default (spec §4.5 Mode A, step 1).
    pub fn unavailable_default() -> Self {
        Self {
            summary: "Unable to build context".to_string(),
            emotion_state: EmotionState::Neutral,
            current_intimacy_level: 50,
            risk_flags: vec![],
            conversation: vec![],
            history_summary: None,
        }
    }
}

/// `intimacy_level` always reflects the *requested* target level;
/// `current_intimacy_level` on `ConversationContext` is the *inferred* level
/// (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneAnalysisResult {
    pub relationship_state: RelationshipState,
    pub scenario: Scenario,
    pub intimacy_level: u8,
    pub current_scenario: Scenario,
    pub recommended_scenario: Scenario,
    pub recommended_strategies: Vec<String>,
    pub risk_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaSnapshot {
    pub style: String,
    pub pacing: Pacing,
    pub risk_tolerance: RiskTolerance,
    pub confidence: f32,
    pub prompt: String,
}

/// At most 10 weights (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub recommended_scenario: Scenario,
    pub strategy_weights: Vec<(String, f32)>,
    pub avoid_strategies: Vec<String>,
}

impl StrategyPlan {
    /// Top-3 strategies by weight, for prompt rendering (spec §4.3).
    pub fn top_strategies(&self, n: usize) -> Vec<&str> {
        let mut weights: Vec<&(String, f32)> = self.strategy_weights.iter().collect();
        weights.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        weights.into_iter().take(n).map(|(name, _)| name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyCandidate {
    pub text: String,
    pub strategy_code: String,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub replies: Vec<ReplyCandidate>,
    pub overall_advice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntimacyCheckResult {
    pub passed: bool,
    pub score: f32,
    pub per_dimension_scores: Vec<f32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersion {
    pub prompt_id: String,
    pub prompt_type: String,
    pub version: String,
    pub content: String,
    pub token_estimate: u32,
    pub is_active: bool,
    pub parent_version: Option<String>,
}

impl PromptVersion {
    pub fn make_id(prompt_type: &str, version: &str) -> String {
        format!("{prompt_type}_{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intimacy_stage_cut_points() {
        assert_eq!(IntimacyStage::from_level(0), IntimacyStage::Stranger);
        assert_eq!(IntimacyStage::from_level(20), IntimacyStage::Stranger);
        assert_eq!(IntimacyStage::from_level(21), IntimacyStage::Acquaintance);
        assert_eq!(IntimacyStage::from_level(40), IntimacyStage::Acquaintance);
        assert_eq!(IntimacyStage::from_level(41), IntimacyStage::Friend);
        assert_eq!(IntimacyStage::from_level(60), IntimacyStage::Friend);
        assert_eq!(IntimacyStage::from_level(61), IntimacyStage::Intimate);
        assert_eq!(IntimacyStage::from_level(80), IntimacyStage::Intimate);
        assert_eq!(IntimacyStage::from_level(81), IntimacyStage::Bonded);
        assert_eq!(IntimacyStage::from_level(100), IntimacyStage::Bonded);
    }

    #[test]
    fn message_speaker_classification() {
        let user = Message { id: "1".into(), speaker: "user".into(), content: "hi".into(), timestamp: None };
        let talker = Message { id: "2".into(), speaker: "talker".into(), content: "hi".into(), timestamp: None };
        let weird = Message { id: "3".into(), speaker: "bot".into(), content: "hi".into(), timestamp: None };
        assert!(user.is_end_user());
        assert!(talker.is_counterpart());
        assert!(weird.is_counterpart());
    }

    #[test]
    fn top_strategies_orders_by_weight_descending() {
        let plan = StrategyPlan {
            recommended_scenario: Scenario::Balanced,
            strategy_weights: vec![
                ("a".to_string(), 0.2),
                ("b".to_string(), 0.9),
                ("c".to_string(), 0.5),
                ("d".to_string(), 0.1),
            ],
            avoid_strategies: vec![],
        };
        assert_eq!(plan.top_strategies(3), vec!["b", "c", "a"]);
    }
}
