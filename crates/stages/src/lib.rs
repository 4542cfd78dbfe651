//! Leaf pipeline stages (spec §4.5, C7): ContextBuilder, SceneAnalyzer,
//! StrategyPlanner, PersonaInferencer, ReplyGenerator, and the pluggable
//! Intimacy Checker (§4.7). The orchestrator drives these in sequence; each
//! stage here is self-contained and individually testable.

pub mod context_builder;
pub mod error;
pub mod intimacy;
pub mod persona_inferencer;
pub mod reply_generator;
pub mod scene_analyzer;
pub mod strategy_planner;

pub use context_builder::ContextBuilder;
pub use error::StageError;
pub use intimacy::{Decision, EvaluatorVerdict, HttpModerationEvaluator, IntimacyChecker, IntimacyEvaluator, LlmPromptEvaluator, LocalLexicalEvaluator};
pub use persona_inferencer::PersonaInferencer;
pub use reply_generator::ReplyGenerator;
pub use scene_analyzer::{derive_risk_flags, SceneAnalyzer};
pub use strategy_planner::{synthesize_fallback, StrategyPlanner};
