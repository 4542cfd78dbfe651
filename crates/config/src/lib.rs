//! The ambient configuration surface (spec §6.5, SPEC_FULL §10.3).
//!
//! `AppConfig` is constructed once at process bootstrap and threaded through
//! explicitly as a value — no module-level singleton.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Url,
    Base64,
}

impl Default for ImageFormat {
    fn default() -> Self {
        ImageFormat::Url
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Tier-agnostic fallback provider, used when quality routing is
    /// disabled or a call pins neither provider nor model.
    pub default_provider: String,
    pub default_model: String,
    pub disable_quality_routing: bool,
    /// How long a provider stays marked unavailable after a failed call.
    pub cool_off_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_provider: "openai-compatible".to_string(),
            default_model: "gpt-4o-mini".to_string(),
            disable_quality_routing: false,
            cool_off_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultimodalConfig {
    pub image_format: ImageFormat,
    pub image_compress: bool,
}

impl Default for MultimodalConfig {
    fn default() -> Self {
        Self {
            image_format: ImageFormat::Url,
            image_compress: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Mode B (single merge-step call) vs Mode A (classic multi-call pipeline).
    pub use_merge_step: bool,
    pub no_strategy_planner: bool,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub cost_limit_usd: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            use_merge_step: false,
            no_strategy_planner: false,
            max_retries: 3,
            timeout_seconds: 30,
            cost_limit_usd: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub use_compact_prompt: bool,
    pub use_compact_v2: bool,
    pub include_reasoning: bool,
    pub log_failed_json_replies: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            use_compact_prompt: true,
            use_compact_v2: true,
            include_reasoning: false,
            log_failed_json_replies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// CORS/DI/persistence boundary knobs. The core only ever reads
/// `supported_languages`; the rest are opaque pass-through values for the
/// `chatcoach-http` collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub supported_languages: Vec<String>,
    pub api_prefix: String,
    pub cors_allowed_origins: Vec<String>,
    pub database_url: String,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            supported_languages: vec!["en".to_string(), "zh".to_string()],
            api_prefix: "/api/v1".to_string(),
            cors_allowed_origins: vec![],
            database_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `redis://` URL. Empty means in-process only.
    pub redis_url: String,
    pub session_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: String::new(),
            session_ttl_seconds: 6 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub multimodal: MultimodalConfig,
    pub orchestrator: OrchestratorConfig,
    pub prompt: PromptConfig,
    pub telemetry: TelemetryConfig,
    pub boundary: BoundaryConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load from a TOML file, falling back to defaults for anything unset or
    /// missing. `V1_SCREENSHOT__BASE_URL` / `V1_LOGGING__LEVEL` are applied
    /// after the file load, matching the v1 collaborator envs in §6.5.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(url) = env::var("V1_SCREENSHOT__BASE_URL") {
            if !url.is_empty() {
                env::set_var("CHATCOACH_SCREENSHOT_BASE_URL", url);
            }
        }
        if let Ok(level) = env::var("V1_LOGGING__LEVEL") {
            if !level.is_empty() {
                config.telemetry.log_level = level;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn is_language_supported(&self, language: &str) -> bool {
        self.boundary
            .supported_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.orchestrator.max_retries, 3);
        assert_eq!(config.orchestrator.cost_limit_usd, 0.1);
        assert!(config.is_language_supported("en"));
        assert!(config.is_language_supported("ZH"));
        assert!(!config.is_language_supported("fr"));
    }

    #[test]
    fn round_trips_through_toml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.orchestrator.max_retries = 5;
        config.provider.default_provider = "acme".to_string();
        config.save_to(&path)?;

        let loaded = AppConfig::load_from(&path)?;
        assert_eq!(loaded.orchestrator.max_retries, 5);
        assert_eq!(loaded.provider.default_provider, "acme");
        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let loaded = AppConfig::load_from("/nonexistent/path/config.toml")?;
        assert_eq!(loaded.orchestrator.max_retries, 3);
        Ok(())
    }
}
