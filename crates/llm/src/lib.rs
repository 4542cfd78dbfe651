//! Uniform call interface over N LLM providers (spec §4.1, C1).
//!
//! Mirrors the shape of a structured chat client: a small request/response
//! pair, a `ProviderClient` trait objects implement, and a router that owns
//! provider availability and per-user accounting. Call sites never see a
//! concrete provider type.

mod error;
mod providers;
mod router;
mod usage;

pub use error::LlmError;
pub use providers::OpenAiCompatibleClient;
pub use router::{LlmRouter, ProviderCandidate, ProviderTier};
pub use usage::{Usage, UsageTracker};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cost/latency tier requested by a caller; maps to a provider-internal tier
/// (`cheap -> low`, `normal -> medium`, `premium -> high`) inside the router.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Cheap,
    Normal,
    Premium,
}

impl Quality {
    pub fn tier(self) -> ProviderTier {
        match self {
            Quality::Cheap => ProviderTier::Low,
            Quality::Normal => ProviderTier::Medium,
            Quality::Premium => ProviderTier::High,
        }
    }

    /// Token budget for reply generation at this tier (spec §4.3).
    pub fn max_reply_tokens(self) -> u32 {
        match self {
            Quality::Cheap => 50,
            Quality::Normal => 100,
            Quality::Premium => 200,
        }
    }

    /// Accepts the one-letter compact code used on the wire (SPEC_FULL §11).
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "C" => Quality::Cheap,
            "P" => Quality::Premium,
            _ => Quality::Normal,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Quality::Cheap => "C",
            Quality::Normal => "N",
            Quality::Premium => "P",
        }
    }
}

/// What a call is for; maps to a provider-facing "scene" tag used by some
/// providers to pick a system persona.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Scene,
    Persona,
    Generation,
    Qc,
    StrategyPlanning,
    MergeStep,
}

impl TaskType {
    pub fn provider_scene(self) -> &'static str {
        match self {
            TaskType::Scene => "system",
            TaskType::Generation => "chat",
            TaskType::Qc => "coach",
            TaskType::Persona => "persona",
            TaskType::StrategyPlanning => "system",
            TaskType::MergeStep => "chat",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Url,
    Base64,
}

#[derive(Debug, Clone)]
pub struct ImageInput {
    pub data: String,
    pub encoding: ImageEncoding,
    pub mime: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmCall {
    pub task_type: TaskType,
    pub prompt: String,
    pub quality: Quality,
    pub user_id: String,
    /// Pins a specific provider/model, bypassing tier routing entirely.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub images: Vec<ImageInput>,
}

impl LlmCall {
    pub fn new(
        task_type: TaskType,
        prompt: impl Into<String>,
        quality: Quality,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            task_type,
            prompt: prompt.into(),
            quality,
            user_id: user_id.into(),
            provider: None,
            model: None,
            max_tokens: None,
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.images.push(image);
        self
    }

    pub fn pin(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self.model = Some(model.into());
        self
    }

    pub fn is_multimodal(&self) -> bool {
        !self.images.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LlmResult {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
    pub latency_ms: u64,
}

impl LlmResult {
    /// A zero-cost result attributed to the `fallback`/`template` pseudo-provider
    /// (spec §4.5.2).
    pub fn fallback_template(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: "fallback".to_string(),
            model: "template".to_string(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            latency_ms: 0,
        }
    }
}

/// A single named provider endpoint. Implementations wrap a `reqwest::Client`
/// and translate `LlmCall` into that provider's wire format.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;
    fn supports_multimodal(&self) -> bool {
        false
    }
    async fn complete(&self, call: &LlmCall, model: &str) -> Result<LlmResult, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_maps_to_tier() {
        assert_eq!(Quality::Cheap.tier(), ProviderTier::Low);
        assert_eq!(Quality::Normal.tier(), ProviderTier::Medium);
        assert_eq!(Quality::Premium.tier(), ProviderTier::High);
    }

    #[test]
    fn quality_token_budgets() {
        assert_eq!(Quality::Cheap.max_reply_tokens(), 50);
        assert_eq!(Quality::Normal.max_reply_tokens(), 100);
        assert_eq!(Quality::Premium.max_reply_tokens(), 200);
    }

    #[test]
    fn quality_code_round_trips() {
        for q in [Quality::Cheap, Quality::Normal, Quality::Premium] {
            assert_eq!(Quality::from_code(q.code()), q);
        }
        assert_eq!(Quality::from_code("?"), Quality::Normal);
    }

    #[test]
    fn task_type_scene_tags() {
        assert_eq!(TaskType::Scene.provider_scene(), "system");
        assert_eq!(TaskType::Generation.provider_scene(), "chat");
        assert_eq!(TaskType::Qc.provider_scene(), "coach");
    }
}
