//! User-Profile Facade (spec §4.5 "Persona inference", C6): read/serialise
//! user persona, record learned traits.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub user_id: String,
    pub style_summary: String,
    pub inferred_topics: Vec<String>,
    pub trait_notes: Vec<String>,
}

impl UserProfile {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), ..Default::default() }
    }

    pub fn is_empty_profile(&self) -> bool {
        self.style_summary.is_empty() && self.inferred_topics.is_empty()
    }

    /// Compact natural-language summary suitable for inclusion in a prompt.
    pub fn to_prompt_summary(&self) -> String {
        if self.is_empty_profile() {
            return "No prior profile on file.".to_string();
        }
        format!("Style: {}. Known topics: {}.", self.style_summary, self.inferred_topics.join(", "))
    }
}

#[async_trait]
pub trait UserProfileFacade: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<UserProfile>;
    async fn record_traits(&self, user_id: &str, traits: Vec<String>) -> Result<()>;
}

/// In-memory facade used when no external trait-learning engine is wired up
/// (e.g. tests, or a deployment that has not configured one). Always
/// returns an empty profile on first fetch, matching spec §4.5 step 4
/// ("if empty, create one").
#[derive(Default)]
pub struct StubProfileFacade;

#[async_trait]
impl UserProfileFacade for StubProfileFacade {
    async fn fetch(&self, user_id: &str) -> Result<UserProfile> {
        Ok(UserProfile::empty(user_id))
    }

    async fn record_traits(&self, _user_id: &str, _traits: Vec<String>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_facade_returns_empty_profile() {
        let facade = StubProfileFacade;
        let profile = facade.fetch("u1").await.unwrap();
        assert!(profile.is_empty_profile());
        assert_eq!(profile.to_prompt_summary(), "No prior profile on file.");
    }

    #[test]
    fn populated_profile_renders_summary() {
        let profile = UserProfile {
            user_id: "u1".to_string(),
            style_summary: "playful and direct".to_string(),
            inferred_topics: vec!["hiking".to_string(), "coffee".to_string()],
            trait_notes: vec![],
        };
        assert_eq!(profile.to_prompt_summary(), "Style: playful and direct. Known topics: hiking, coffee.");
    }
}
