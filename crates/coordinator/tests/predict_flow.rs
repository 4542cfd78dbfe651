//! End-to-end exercise of `PredictCoordinator::predict` across process
//! boundaries a unit test inside `coordinator.rs` doesn't cross: a real
//! `SessionCache` shared across two calls, and the full validation ->
//! grouping -> dispatch -> anchor pipeline for each scene.

use std::sync::Arc;

use async_trait::async_trait;

use chatcoach_audit::NullAuditSink;
use chatcoach_cache::SessionCache;
use chatcoach_collab::{DimensionFetcher, ScreenshotClient, StubProfileFacade};
use chatcoach_config::{AppConfig, OrchestratorConfig, PromptConfig};
use chatcoach_coordinator::{CoordinatorError, PredictCoordinator, PredictRequest};
use chatcoach_llm::{LlmCall, LlmError, LlmResult, LlmRouter, ProviderCandidate, ProviderClient, ProviderTier, TaskType};
use chatcoach_orchestrator::Orchestrator;
use chatcoach_prompt::types::{ConversationContext, SceneAnalysisResult};
use chatcoach_stages::{Decision, EvaluatorVerdict, IntimacyEvaluator};

struct ScriptedProvider;

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }
    async fn complete(&self, call: &LlmCall, model: &str) -> Result<LlmResult, LlmError> {
        let text = match call.task_type {
            TaskType::Generation => r#"{"r":[["Good to see you!","curiosity_hook"]],"adv":"keep it casual"}"#.to_string(),
            _ => r#"{"rs":"P","sc":"B","il":25,"cs":"B","rc":"B","st":["curiosity_hook"],"rf":[]}"#.to_string(),
        };
        Ok(LlmResult { text, provider: "scripted".to_string(), model: model.to_string(), input_tokens: 5, output_tokens: 5, cost_usd: 0.0, latency_ms: 1 })
    }
}

struct AlwaysPass;

#[async_trait]
impl IntimacyEvaluator for AlwaysPass {
    async fn evaluate(
        &self,
        _candidate: &str,
        _target_intimacy: u8,
        _persona_prompt: &str,
        _scene: &SceneAnalysisResult,
        _context: &ConversationContext,
    ) -> anyhow::Result<EvaluatorVerdict> {
        Ok(EvaluatorVerdict { decision: Decision::Pass, per_dimension_levels: vec![10] })
    }
}

fn coordinator() -> PredictCoordinator {
    let router = Arc::new(LlmRouter::new(
        vec![Arc::new(ScriptedProvider)],
        vec![
            (ProviderTier::Low, vec![ProviderCandidate::new("scripted", "m1")]),
            (ProviderTier::Medium, vec![ProviderCandidate::new("scripted", "m1")]),
            (ProviderTier::High, vec![ProviderCandidate::new("scripted", "m1")]),
        ],
        std::time::Duration::from_secs(60),
        ProviderCandidate::new("scripted", "m1"),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        router,
        Arc::new(StubProfileFacade),
        Arc::new(AlwaysPass),
        Arc::new(NullAuditSink),
        PromptConfig::default(),
        OrchestratorConfig::default(),
        true,
        "reply_v1",
    ));
    PredictCoordinator::new(
        orchestrator,
        Arc::new(SessionCache::new()),
        Arc::new(ScreenshotClient::new("http://localhost:9")),
        DimensionFetcher::new(),
        AppConfig::default(),
    )
}

fn request(session_id: &str, scene: u8) -> PredictRequest {
    PredictRequest {
        content: vec!["hi there".to_string()],
        language: "en".to_string(),
        scene,
        user_id: "u1".to_string(),
        session_id: session_id.to_string(),
        request_id: None,
        other_properties: String::new(),
        conf_threshold: Some(0.4),
        reply: true,
        scene_analysis: true,
    }
}

#[tokio::test]
async fn a_second_request_on_the_same_session_reuses_the_locked_scene() {
    let coordinator = coordinator();

    let first = coordinator.predict(request("session-a", 1)).await.unwrap();
    assert!(first.success);
    assert_eq!(first.results.len(), 1);
    assert!(first.suggested_replies.is_some());

    // scene 3 normalises to 1, so this should NOT be rejected as a mismatch.
    let second = coordinator.predict(request("session-a", 3)).await.unwrap();
    assert!(second.success);
}

#[tokio::test]
async fn a_session_locked_to_one_scene_rejects_a_different_scene() {
    let coordinator = coordinator();

    coordinator.predict(request("session-b", 1)).await.unwrap();
    let err = coordinator.predict(request("session-b", 2)).await.unwrap_err();

    assert!(matches!(err, CoordinatorError::SceneMismatch { .. }));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn repeated_image_groups_within_a_session_hit_the_cache_on_the_second_request() {
    let coordinator = coordinator();
    let mut first_request = request("session-c", 1);
    first_request.content = vec!["https://cdn.example.com/shot.png".to_string()];

    let first = coordinator.predict(first_request.clone()).await.unwrap();
    let second = coordinator.predict(first_request).await.unwrap();

    assert_eq!(first.results[0].content, second.results[0].content);
    assert_eq!(first.suggested_replies, second.suggested_replies);
}
