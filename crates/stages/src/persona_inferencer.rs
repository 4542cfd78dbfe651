//! PersonaInferencer (spec §4.5 Mode A step 4).
//!
//! Reads the user's profile from the facade (creating an empty one on
//! first sight), and optionally runs an LLM-driven analyser to refine
//! style/pacing/risk-tolerance; falls back to profile-derived defaults on
//! any LLM failure.

use std::sync::Arc;

use chatcoach_collab::UserProfileFacade;
use chatcoach_llm::{LlmCall, LlmRouter, Quality, TaskType};
use chatcoach_prompt::extract::extract_json;
use chatcoach_prompt::schema::{pacing_from_str, risk_tolerance_from_str};
use chatcoach_prompt::types::{ConversationContext, Pacing, PersonaSnapshot, RiskTolerance};

pub struct PersonaInferencer {
    facade: Arc<dyn UserProfileFacade>,
    llm: Arc<LlmRouter>,
}

impl PersonaInferencer {
    pub fn new(facade: Arc<dyn UserProfileFacade>, llm: Arc<LlmRouter>) -> Self {
        Self { facade, llm }
    }

    fn build_prompt(profile_summary: &str, context: &ConversationContext) -> String {
        format!(
            "User profile: {profile_summary}\nConversation summary: {}\n\
             Infer the end-user's conversational style. \
             Respond with JSON only: {{\"style\":\"...\",\"pacing\":\"slow|normal|fast\",\
             \"risk_tolerance\":\"low|medium|high\",\"confidence\":0.0-1.0}}",
            context.summary,
        )
    }

    pub async fn infer(&self, user_id: &str, context: &ConversationContext) -> PersonaSnapshot {
        let profile = match self.facade.fetch(user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(error = %err, "profile facade unavailable, using empty profile");
                chatcoach_collab::UserProfile::empty(user_id)
            }
        };

        match self.try_infer(&profile, context, user_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "persona inference failed, using profile defaults");
                default_snapshot(&profile)
            }
        }
    }

    async fn try_infer(
        &self,
        profile: &chatcoach_collab::UserProfile,
        context: &ConversationContext,
        user_id: &str,
    ) -> anyhow::Result<PersonaSnapshot> {
        let prompt = Self::build_prompt(&profile.to_prompt_summary(), context);
        let call = LlmCall::new(TaskType::Persona, prompt.clone(), Quality::Cheap, user_id);
        let result = self.llm.call(call).await?;
        let value = extract_json(&result.text)?;

        Ok(PersonaSnapshot {
            style: value["style"].as_str().unwrap_or(&profile.style_summary).to_string(),
            pacing: pacing_from_str(value["pacing"].as_str().unwrap_or("")),
            risk_tolerance: risk_tolerance_from_str(value["risk_tolerance"].as_str().unwrap_or("")),
            confidence: value["confidence"].as_f64().unwrap_or(0.5) as f32,
            prompt,
        })
    }
}

/// Used when the LLM-driven analyser isn't available or fails: the profile's
/// own style summary (possibly empty) and neutral defaults elsewhere.
fn default_snapshot(profile: &chatcoach_collab::UserProfile) -> PersonaSnapshot {
    PersonaSnapshot {
        style: if profile.is_empty_profile() { "unknown, still learning".to_string() } else { profile.style_summary.clone() },
        pacing: Pacing::Normal,
        risk_tolerance: RiskTolerance::Medium,
        confidence: if profile.is_empty_profile() { 0.2 } else { 0.5 },
        prompt: profile.to_prompt_summary(),
    }
}
