//! Mode A: the classic multi-call pipeline (spec §4.5).
//!
//! context ≺ scene ≺ strategy ≺ persona ≺ generation ≺ intimacy-check, with
//! retries on a failed intimacy check and a scene-indexed fallback template
//! as the last line of defence (spec §5 "happens-before order").

use std::sync::Arc;

use chatcoach_audit::{AuditSink, FailedReplyLog, GenerationResultLog, IntimacyCheckLog, LlmCallLog, PersonaSnapshotLog, SceneAnalysisLog};
use chatcoach_cache::CacheError;
use chatcoach_collab::UserProfileFacade;
use chatcoach_config::{OrchestratorConfig, PromptConfig};
use chatcoach_llm::{LlmResult, LlmRouter, Quality};
use chatcoach_prompt::schema::{pacing_code, relationship_state_code, risk_tolerance_code, scenario_code};
use chatcoach_prompt::types::{ConversationContext, GenerationOutput, IntimacyCheckResult, Message, PersonaSnapshot, SceneAnalysisResult, StrategyPlan};
use chatcoach_prompt::{PromptAssembler, ReplyPromptInputs};
use chatcoach_stages::{derive_risk_flags, synthesize_fallback, ContextBuilder, IntimacyChecker, IntimacyEvaluator, PersonaInferencer, ReplyGenerator, SceneAnalyzer, StageError, StrategyPlanner};

use crate::attempt::AttemptState;
use crate::fallback::fallback_result;
use crate::retry::perturb_for_retry;

pub struct ModeARequest {
    pub request_id: String,
    pub session_id: String,
    pub user_id: String,
    pub conversation: Vec<Message>,
    pub target_intimacy: u8,
}

pub struct ModeAOutcome {
    pub context: ConversationContext,
    pub scene: Option<SceneAnalysisResult>,
    pub persona: Option<PersonaSnapshot>,
    pub plan: Option<StrategyPlan>,
    pub generation: GenerationOutput,
    pub fallback_used: bool,
    pub attempt_state: AttemptState,
    pub total_cost_usd: f64,
    /// Per-bubble text/sender/position, populated only by [`crate::mode_b`]'s
    /// merge-step call; Mode A has no bubble geometry of its own to report
    /// since screenshot parsing happens in the coordinator, not here.
    pub bubble_dialogs: Option<Vec<crate::mode_b::ParsedDialog>>,
}

pub struct Orchestrator {
    llm: Arc<LlmRouter>,
    context_builder: ContextBuilder,
    scene_analyzer: SceneAnalyzer,
    strategy_planner: StrategyPlanner,
    persona_inferencer: PersonaInferencer,
    reply_generator: ReplyGenerator,
    intimacy_checker: IntimacyChecker,
    prompt_config: PromptConfig,
    orchestrator_config: OrchestratorConfig,
    audit: Arc<dyn AuditSink>,
    reply_prompt_version_name: String,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<LlmRouter>,
        profile_facade: Arc<dyn UserProfileFacade>,
        intimacy_evaluator: Arc<dyn IntimacyEvaluator>,
        audit: Arc<dyn AuditSink>,
        prompt_config: PromptConfig,
        orchestrator_config: OrchestratorConfig,
        fail_open: bool,
        reply_prompt_version_name: impl Into<String>,
    ) -> Self {
        Self {
            llm: llm.clone(),
            context_builder: ContextBuilder::new(llm.clone()),
            scene_analyzer: SceneAnalyzer::new(llm.clone()),
            strategy_planner: StrategyPlanner::new(llm.clone()),
            persona_inferencer: PersonaInferencer::new(profile_facade, llm.clone()),
            reply_generator: ReplyGenerator::new(llm.clone()),
            intimacy_checker: IntimacyChecker::new(intimacy_evaluator, fail_open),
            prompt_config,
            orchestrator_config,
            audit,
            reply_prompt_version_name: reply_prompt_version_name.into(),
        }
    }

    pub(crate) fn llm(&self) -> &Arc<LlmRouter> {
        &self.llm
    }

    pub async fn run_mode_a(&self, request: ModeARequest) -> ModeAOutcome {
        let context = self.build_context(&request).await;

        let scene = match self.scene_analyzer.analyze(&context, request.target_intimacy, &request.user_id).await {
            Ok(mut scene) => {
                scene.risk_flags.extend(derive_risk_flags(request.target_intimacy, context.current_intimacy_level));
                self.audit_scene(&request, &scene).await;
                scene
            }
            Err(err) => {
                // Scene analysis is not in the locally-recoverable set (spec
                // §7): this aborts the current attempt entirely.
                tracing::error!(error = %err, request_id = %request.request_id, "scene analysis failed, aborting pipeline attempt");
                return self.exhausted_outcome(context, None, None);
            }
        };

        self.resume_from_scene(&request, context, scene).await
    }

    async fn build_context(&self, request: &ModeARequest) -> ConversationContext {
        match self.context_builder.build(&request.conversation, &request.user_id).await {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(error = %err, request_id = %request.request_id, "context build failed, substituting conservative default");
                let mut default = ConversationContext::unavailable_default();
                default.conversation = request.conversation.clone();
                default
            }
        }
    }

    /// Shared tail of both execution modes, starting from stage 3
    /// (strategy planning); Mode B's merge-step call replaces stages 1+2
    /// and hands a scene it already has to this same continuation.
    pub(crate) async fn resume_from_scene(
        &self,
        request: &ModeARequest,
        context: ConversationContext,
        scene: SceneAnalysisResult,
    ) -> ModeAOutcome {
        let plan = if self.orchestrator_config.no_strategy_planner {
            synthesize_fallback(&scene)
        } else {
            self.strategy_planner.plan(&scene, &request.user_id).await
        };

        let persona = self.persona_inferencer.infer(&request.user_id, &context).await;
        self.audit_persona(request, &persona).await;

        self.run_generation_attempts(request, context, scene, plan, persona).await
    }

    async fn run_generation_attempts(
        &self,
        request: &ModeARequest,
        context: ConversationContext,
        scene: SceneAnalysisResult,
        plan: StrategyPlan,
        persona: PersonaSnapshot,
    ) -> ModeAOutcome {
        let max_retries = self.orchestrator_config.max_retries.max(1);
        let mut current_plan = plan.clone();
        let mut cost_usd = 0.0_f64;
        let mut last_generation: Option<GenerationOutput> = None;
        let mut accepted = false;

        for attempt_number in 1..=max_retries {
            let quality = if cost_usd >= self.orchestrator_config.cost_limit_usd { Quality::Cheap } else { Quality::Normal };

            let max_tokens = if attempt_number == 1 {
                quality.max_reply_tokens()
            } else {
                let seed = perturb_for_retry(&plan, attempt_number);
                current_plan = seed.plan;
                (quality.max_reply_tokens() as f32 * seed.max_tokens_scale).round() as u32
            };

            let assembler = PromptAssembler::new(&self.prompt_config);
            let inputs = ReplyPromptInputs {
                context: &context,
                plan: Some(&current_plan),
                persona: &persona,
                target_intimacy: request.target_intimacy,
                prompt_version_name: &self.reply_prompt_version_name,
            };
            let prompt = assembler.build_reply_prompt(&inputs, quality);

            let generated = self.reply_generator.generate(prompt, quality, &request.user_id, Some(max_tokens)).await;

            let (generation, llm_result) = match generated {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, attempt = attempt_number, request_id = %request.request_id, "reply generation attempt failed");
                    if let StageError::ReplyParseFailed { preview } = &err {
                        if self.prompt_config.log_failed_json_replies {
                            self.audit.failed_reply(FailedReplyLog::new(request.request_id.clone(), "generation", preview)).await;
                        }
                    }
                    self.audit_llm_call(request, "generation", None, false).await;
                    continue;
                }
            };

            cost_usd += llm_result.cost_usd;
            self.audit_llm_call(request, "generation", Some(&llm_result), true).await;

            let Some(top) = generation.replies.first() else {
                self.audit_generation(request, attempt_number, false, 0).await;
                continue;
            };

            let check = self
                .intimacy_checker
                .check(&top.text, request.target_intimacy, &persona.prompt, &scene, &context)
                .await;
            self.audit_intimacy(request, &check).await;
            self.audit_generation(request, attempt_number, false, generation.replies.len()).await;

            last_generation = Some(generation);
            if check.passed {
                accepted = true;
                break;
            }
        }

        let attempt_state = if accepted { AttemptState::Accepted } else { AttemptState::Exhausted };

        if accepted {
            ModeAOutcome {
                context,
                scene: Some(scene),
                persona: Some(persona),
                plan: Some(current_plan),
                generation: last_generation.expect("accepted attempt always carries a generation"),
                fallback_used: false,
                attempt_state,
                total_cost_usd: cost_usd,
                bubble_dialogs: None,
            }
        } else {
            let mut outcome = self.exhausted_outcome(context, Some(scene), Some(persona));
            outcome.plan = Some(current_plan);
            outcome.total_cost_usd = cost_usd;
            if let Some(generation) = last_generation {
                outcome.generation.replies.extend(generation.replies);
            }
            outcome
        }
    }

    pub(crate) fn exhausted_outcome(
        &self,
        context: ConversationContext,
        scene: Option<SceneAnalysisResult>,
        persona: Option<PersonaSnapshot>,
    ) -> ModeAOutcome {
        let relationship_state = scene.as_ref().map(|s| s.relationship_state);
        let fallback = fallback_result(relationship_state);
        ModeAOutcome {
            context,
            scene,
            persona,
            plan: None,
            generation: GenerationOutput {
                replies: vec![chatcoach_prompt::types::ReplyCandidate {
                    text: fallback.text,
                    strategy_code: "fallback_template".to_string(),
                    reasoning: None,
                }],
                overall_advice: String::new(),
            },
            fallback_used: true,
            attempt_state: AttemptState::Exhausted,
            total_cost_usd: 0.0,
            bubble_dialogs: None,
        }
    }

    async fn audit_scene(&self, request: &ModeARequest, scene: &SceneAnalysisResult) {
        self.audit
            .scene_analysis(SceneAnalysisLog::new(
                request.request_id.clone(),
                request.session_id.clone(),
                relationship_state_code(scene.relationship_state),
                scenario_code(scene.scenario),
                scene.intimacy_level,
                scene.recommended_strategies.clone(),
                scene.risk_flags.clone(),
            ))
            .await;
    }

    async fn audit_persona(&self, request: &ModeARequest, persona: &PersonaSnapshot) {
        self.audit
            .persona_snapshot(PersonaSnapshotLog::new(
                request.request_id.clone(),
                request.user_id.clone(),
                persona.style.clone(),
                pacing_code(persona.pacing),
                risk_tolerance_code(persona.risk_tolerance),
                persona.confidence,
            ))
            .await;
    }

    async fn audit_intimacy(&self, request: &ModeARequest, check: &IntimacyCheckResult) {
        self.audit
            .intimacy_check(IntimacyCheckLog {
                id: uuid::Uuid::new_v4().to_string(),
                request_id: request.request_id.clone(),
                session_id: request.session_id.clone(),
                passed: check.passed,
                score: check.score,
                per_dimension_scores: check.per_dimension_scores.clone(),
                reason: check.reason.clone(),
                created_at: chrono::Utc::now(),
            })
            .await;
    }

    async fn audit_generation(&self, request: &ModeARequest, attempt: u32, fallback: bool, reply_count: usize) {
        self.audit
            .generation_result(GenerationResultLog {
                id: uuid::Uuid::new_v4().to_string(),
                request_id: request.request_id.clone(),
                session_id: request.session_id.clone(),
                attempt,
                fallback,
                reply_count,
                created_at: chrono::Utc::now(),
            })
            .await;
    }

    async fn audit_llm_call(&self, request: &ModeARequest, task_type: &str, result: Option<&LlmResult>, succeeded: bool) {
        let (provider, model, input_tokens, output_tokens, cost_usd, latency_ms) = match result {
            Some(result) => (
                result.provider.clone(),
                result.model.clone(),
                result.input_tokens,
                result.output_tokens,
                result.cost_usd,
                result.latency_ms,
            ),
            None => (String::new(), String::new(), 0, 0, 0.0, 0),
        };
        self.audit
            .llm_call(LlmCallLog {
                id: uuid::Uuid::new_v4().to_string(),
                request_id: request.request_id.clone(),
                user_id: request.user_id.clone(),
                task_type: task_type.to_string(),
                provider,
                model,
                input_tokens,
                output_tokens,
                cost_usd,
                latency_ms,
                succeeded,
                created_at: chrono::Utc::now(),
            })
            .await;
    }
}

/// Maps a `CacheError` into the `cache_unavailable` degrade-to-empty policy
/// used by the coordinator (spec §7); kept here since the orchestrator is
/// the first layer that observes a scene-consistency failure on Mode B's
/// path through the cache.
pub fn is_scene_mismatch(err: &CacheError) -> bool {
    matches!(err, CacheError::SceneMismatch { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatcoach_audit::NullAuditSink;
    use chatcoach_collab::StubProfileFacade;
    use chatcoach_llm::{LlmCall, LlmError, ProviderCandidate, ProviderClient, ProviderTier};
    use chatcoach_stages::{Decision, EvaluatorVerdict};
    use chatcoach_prompt::types::EmotionState;

    struct ScriptedProvider {
        scene_response: String,
        reply_response: String,
    }

    #[async_trait]
    impl ProviderClient for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(&self, call: &LlmCall, model: &str) -> Result<LlmResult, LlmError> {
            let text = match call.task_type {
                chatcoach_llm::TaskType::Generation => self.reply_response.clone(),
                _ => self.scene_response.clone(),
            };
            Ok(LlmResult { text, provider: "scripted".to_string(), model: model.to_string(), input_tokens: 10, output_tokens: 10, cost_usd: 0.001, latency_ms: 1 })
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

    struct AlwaysFail;

    #[async_trait]
    impl IntimacyEvaluator for AlwaysFail {
        async fn evaluate(
            &self,
            _candidate: &str,
            _target_intimacy: u8,
            _persona_prompt: &str,
            _scene: &SceneAnalysisResult,
            _context: &ConversationContext,
        ) -> anyhow::Result<EvaluatorVerdict> {
            Ok(EvaluatorVerdict { decision: Decision::Fail, per_dimension_levels: vec![99] })
        }
    }

    fn router(scene_response: &str, reply_response: &str) -> Arc<LlmRouter> {
        Arc::new(LlmRouter::new(
            vec![Arc::new(ScriptedProvider { scene_response: scene_response.to_string(), reply_response: reply_response.to_string() })],
            vec![
                (ProviderTier::Low, vec![ProviderCandidate::new("scripted", "m1")]),
                (ProviderTier::Medium, vec![ProviderCandidate::new("scripted", "m1")]),
                (ProviderTier::High, vec![ProviderCandidate::new("scripted", "m1")]),
            ],
            std::time::Duration::from_secs(60),
            ProviderCandidate::new("scripted", "m1"),
        ))
    }

    fn sample_request() -> ModeARequest {
        ModeARequest {
            request_id: "req-1".to_string(),
            session_id: "sess-1".to_string(),
            user_id: "u1".to_string(),
            conversation: vec![Message { id: "1".into(), speaker: "talker".into(), content: "hey".into(), timestamp: None }],
            target_intimacy: 30,
        }
    }

    #[tokio::test]
    async fn accepted_attempt_returns_generated_reply_without_fallback() {
        let scene_json = r#"{"summary":"hi","emotion_state":"neutral","intimacy_level":30,"risk_flags":[],"rs":"P","sc":"B","il":30,"cs":"B","rc":"B","st":["curiosity_hook"],"rf":[]}"#;
        let reply_json = r#"{"r":[["Hey! How's it going?","curiosity_hook"]],"adv":"keep it light"}"#;
        let orchestrator = Orchestrator::new(
            router(scene_json, reply_json),
            Arc::new(StubProfileFacade),
            Arc::new(AlwaysPass),
            Arc::new(NullAuditSink),
            PromptConfig::default(),
            OrchestratorConfig::default(),
            true,
            "reply_v1",
        );
        let outcome = orchestrator.run_mode_a(sample_request()).await;
        assert!(!outcome.fallback_used);
        assert_eq!(outcome.attempt_state, AttemptState::Accepted);
        assert_eq!(outcome.generation.replies[0].text, "Hey! How's it going?");
    }

    #[tokio::test]
    async fn exhausted_after_max_retries_returns_fallback_template() {
        let scene_json = r#"{"rs":"P","sc":"B","il":30,"cs":"B","rc":"B","st":["curiosity_hook"],"rf":[]}"#;
        let reply_json = r#"{"r":[["too intimate reply","curiosity_hook"]],"adv":"n/a"}"#;
        let orchestrator = Orchestrator::new(
            router(scene_json, reply_json),
            Arc::new(StubProfileFacade),
            Arc::new(AlwaysFail),
            Arc::new(NullAuditSink),
            PromptConfig::default(),
            OrchestratorConfig { max_retries: 3, ..Default::default() },
            true,
            "reply_v1",
        );
        let outcome = orchestrator.run_mode_a(sample_request()).await;
        assert!(outcome.fallback_used);
        assert_eq!(outcome.attempt_state, AttemptState::Exhausted);
    }

    #[tokio::test]
    async fn scene_analysis_failure_aborts_with_unknown_relationship_fallback() {
        struct FailingScene;
        #[async_trait]
        impl ProviderClient for FailingScene {
            fn name(&self) -> &str {
                "scripted"
            }
            async fn complete(&self, call: &LlmCall, model: &str) -> Result<LlmResult, LlmError> {
                match call.task_type {
                    chatcoach_llm::TaskType::Scene => Err(LlmError::Transport { provider: "scripted".to_string(), source: anyhow::anyhow!("down") }),
                    _ => Ok(LlmResult { text: "{}".to_string(), provider: "scripted".to_string(), model: model.to_string(), input_tokens: 0, output_tokens: 0, cost_usd: 0.0, latency_ms: 0 }),
                }
            }
        }
        let router = Arc::new(LlmRouter::new(
            vec![Arc::new(FailingScene)],
            vec![(ProviderTier::Low, vec![ProviderCandidate::new("scripted", "m1")]), (ProviderTier::Medium, vec![ProviderCandidate::new("scripted", "m1")])],
            std::time::Duration::from_secs(60),
            ProviderCandidate::new("scripted", "m1"),
        ));
        let orchestrator = Orchestrator::new(
            router,
            Arc::new(StubProfileFacade),
            Arc::new(AlwaysPass),
            Arc::new(NullAuditSink),
            PromptConfig::default(),
            OrchestratorConfig::default(),
            true,
            "reply_v1",
        );
        let outcome = orchestrator.run_mode_a(sample_request()).await;
        assert!(outcome.fallback_used);
        assert!(outcome.scene.is_none());
        assert_eq!(outcome.generation.replies[0].text, "Okay, I understand.");
    }
}
