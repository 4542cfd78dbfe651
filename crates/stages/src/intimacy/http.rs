//! HTTP moderation evaluator — fallback when the local lexical library is
//! not importable and HTTP fallback is enabled (spec §4.7).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chatcoach_prompt::types::{ConversationContext, SceneAnalysisResult};

use super::{Decision, EvaluatorVerdict, IntimacyEvaluator};

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    text: &'a str,
    target_intimacy: u8,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    decision: String,
    per_dimension_levels: Vec<u8>,
}

pub struct HttpModerationEvaluator {
    base_url: String,
    client: reqwest::Client,
}

impl HttpModerationEvaluator {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build().unwrap_or_default();
        Self { base_url: base_url.into(), client }
    }
}

#[async_trait]
impl IntimacyEvaluator for HttpModerationEvaluator {
    async fn evaluate(
        &self,
        candidate: &str,
        target_intimacy: u8,
        _persona_prompt: &str,
        _scene: &SceneAnalysisResult,
        _context: &ConversationContext,
    ) -> anyhow::Result<EvaluatorVerdict> {
        let response: ModerationResponse = self
            .client
            .post(format!("{}/moderate", self.base_url))
            .json(&ModerationRequest { text: candidate, target_intimacy })
            .send()
            .await?
            .json()
            .await?;

        let decision = if response.decision.eq_ignore_ascii_case("pass") { Decision::Pass } else { Decision::Fail };
        Ok(EvaluatorVerdict { decision, per_dimension_levels: response.per_dimension_levels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_response_parses_pass_decision() {
        let raw = serde_json::json!({"decision": "pass", "per_dimension_levels": [10, 20]});
        let parsed: ModerationResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.decision, "pass");
        assert_eq!(parsed.per_dimension_levels, vec![10, 20]);
    }
}
