//! Per-request driver (spec §4.6, C9).
//!
//! Control flow: validate -> scene-consistency check -> group `content` into
//! analysis groups -> for each image group, cache-or-orchestrate (bounded
//! fan-out, spec §5) -> merge per-group results -> pick the reply anchor on
//! the last group -> assemble the response.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use chatcoach_cache::{normalize_scene, CacheCategory, CacheKey, SessionCache};
use chatcoach_collab::{normalize_bbox, DimensionFetcher, ImageDimensions, ScreenshotClient};
use chatcoach_config::{AppConfig, ImageFormat};
use chatcoach_llm::ImageEncoding;
use chatcoach_orchestrator::{ModeAOutcome, ModeARequest, ModeBRequest, Orchestrator};
use chatcoach_prompt::types::Message;

use crate::anchor::validate_reply_anchor;
use crate::error::CoordinatorError;
use crate::grouping::{group_content, AnalysisGroup};
use crate::request::PredictRequest;
use crate::response::{DialogItem, ImageResult, PredictResponse};

/// One task per image, joined before reply generation (spec §5).
const MAX_CONCURRENT_GROUPS: usize = 4;

/// What gets cached under `CacheCategory::ImageResult`: the rendered
/// `ImageResult` plus a snapshot of whatever reply was generated the last
/// time this resource was the final group, so a cache hit on the last
/// group doesn't force a fresh LLM call just to fill `suggested_replies`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CachedImagePayload {
    image_result: ImageResult,
    suggested_reply: Option<String>,
}

struct ResolvedGroup {
    image_result: ImageResult,
    suggested_reply: Option<String>,
}

pub struct PredictCoordinator {
    orchestrator: Arc<Orchestrator>,
    cache: Arc<SessionCache>,
    screenshot_client: Arc<ScreenshotClient>,
    dimension_fetcher: DimensionFetcher,
    config: AppConfig,
}

impl PredictCoordinator {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        cache: Arc<SessionCache>,
        screenshot_client: Arc<ScreenshotClient>,
        dimension_fetcher: DimensionFetcher,
        config: AppConfig,
    ) -> Self {
        Self { orchestrator, cache, screenshot_client, dimension_fetcher, config }
    }

    pub async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, CoordinatorError> {
        let request_id = request.validate(&self.config)?;

        if let Err(err) = self.cache.check_scene_consistency(&request.session_id, request.scene) {
            return Err(self.attach_session_id(err.into(), &request.session_id));
        }

        let mut response = PredictResponse::success(request_id, &request);

        if request.scene == 2 {
            return self.run_text_qa(&request, response).await;
        }

        let groups = group_content(&request.content);
        let normalized_scene = normalize_scene(request.scene);
        let resolved = self.resolve_groups(&request, &groups, normalized_scene).await?;

        response.results = resolved.iter().map(|group| group.image_result.clone()).collect();

        if request.reply {
            let (Some(last_group), Some(last_resolved)) = (groups.last(), resolved.last()) else {
                return Err(CoordinatorError::NoDialogForReply);
            };
            validate_reply_anchor(last_group, &last_resolved.image_result)?;
            let reply = last_resolved.suggested_reply.clone().ok_or(CoordinatorError::NoDialogForReply)?;
            response.suggested_replies = Some(vec![reply]);
        }

        Ok(response)
    }

    fn attach_session_id(&self, err: CoordinatorError, session_id: &str) -> CoordinatorError {
        match err {
            CoordinatorError::SceneMismatch { previous, requested, .. } => {
                CoordinatorError::SceneMismatch { session_id: session_id.to_string(), previous, requested }
            }
            other => other,
        }
    }

    async fn run_text_qa(&self, request: &PredictRequest, mut response: PredictResponse) -> Result<PredictResponse, CoordinatorError> {
        let prompt = request.content.join("\n");
        let result = self
            .orchestrator
            .run_text_qa(prompt, &request.user_id)
            .await
            .map_err(|err| CoordinatorError::Orchestration(err.to_string()))?;
        response.suggested_replies = Some(vec![result.text]);
        Ok(response)
    }

    fn target_intimacy(&self, request: &PredictRequest) -> u8 {
        request.conf_threshold.map(|value| (value * 100.0).round() as u8).unwrap_or(50)
    }

    async fn resolve_groups(
        &self,
        request: &PredictRequest,
        groups: &[AnalysisGroup],
        normalized_scene: u8,
    ) -> Result<Vec<ResolvedGroup>, CoordinatorError> {
        let mut indexed: Vec<(usize, Result<ResolvedGroup, CoordinatorError>)> = stream::iter(groups.iter().enumerate())
            .map(|(index, group)| async move { (index, self.resolve_group(request, group, normalized_scene).await) })
            .buffer_unordered(MAX_CONCURRENT_GROUPS)
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    async fn resolve_group(&self, request: &PredictRequest, group: &AnalysisGroup, normalized_scene: u8) -> Result<ResolvedGroup, CoordinatorError> {
        match &group.image_url {
            Some(url) => self.resolve_image_group(request, url, group, normalized_scene).await,
            None => self.resolve_text_group(request, group).await,
        }
    }

    async fn resolve_image_group(&self, request: &PredictRequest, url: &str, group: &AnalysisGroup, normalized_scene: u8) -> Result<ResolvedGroup, CoordinatorError> {
        let key = CacheKey::new(&request.session_id, CacheCategory::ImageResult, url, normalized_scene);
        if let Some(event) = self.cache.get_resource_category_last(&key) {
            if let Ok(cached) = serde_json::from_value::<CachedImagePayload>(event.payload) {
                return Ok(ResolvedGroup { image_result: cached.image_result, suggested_reply: cached.suggested_reply });
            }
        }

        let resolved = if self.config.orchestrator.use_merge_step {
            self.resolve_via_merge_step(request, url, group).await?
        } else {
            self.resolve_via_screenshot_parser(request, url, group).await?
        };

        let payload = CachedImagePayload { image_result: resolved.image_result.clone(), suggested_reply: resolved.suggested_reply.clone() };
        if let Ok(value) = serde_json::to_value(&payload) {
            self.cache.append_event(&key, value);
        }

        Ok(resolved)
    }

    async fn resolve_via_screenshot_parser(&self, request: &PredictRequest, url: &str, group: &AnalysisGroup) -> Result<ResolvedGroup, CoordinatorError> {
        let bubbles = self.screenshot_client.parse(url).await.map_err(|err| CoordinatorError::CollaboratorUnavailable(err.to_string()))?;

        let mut conversation: Vec<Message> = bubbles
            .iter()
            .enumerate()
            .map(|(index, bubble)| Message { id: format!("bubble-{index}"), speaker: bubble.sender.clone(), content: bubble.text.clone(), timestamp: None })
            .collect();
        conversation.extend(self.trailing_text_messages(group));

        let outcome = self
            .orchestrator
            .run_mode_a(ModeARequest {
                request_id: request.request_id.clone().unwrap_or_default(),
                session_id: request.session_id.clone(),
                user_id: request.user_id.clone(),
                conversation,
                target_intimacy: self.target_intimacy(request),
            })
            .await;

        // Screenshot-parser bboxes aren't guaranteed pixel-space; `normalize_bbox`
        // detects already-normalised input and only divides by `dims` otherwise.
        let dims = ImageDimensions::placeholder();
        let dialogs = bubbles
            .iter()
            .map(|bubble| {
                let normalized = normalize_bbox(&bubble.bbox, dims);
                DialogItem { position: normalized.as_array(), text: bubble.text.clone(), speaker: bubble.sender.clone(), from_user: bubble.sender == "user" }
            })
            .collect();

        let image_result = ImageResult { content: url.to_string(), dialogs, scenario: self.serialize_scenario(request, &outcome) };
        let suggested_reply = outcome.generation.replies.first().map(|reply| reply.text.clone());
        Ok(ResolvedGroup { image_result, suggested_reply })
    }

    async fn resolve_via_merge_step(&self, request: &PredictRequest, url: &str, group: &AnalysisGroup) -> Result<ResolvedGroup, CoordinatorError> {
        let outcome = self
            .orchestrator
            .run_mode_b(
                ModeBRequest {
                    request_id: request.request_id.clone().unwrap_or_default(),
                    session_id: request.session_id.clone(),
                    user_id: request.user_id.clone(),
                    image_url: url.to_string(),
                    image_encoding: match self.config.multimodal.image_format {
                        ImageFormat::Url => ImageEncoding::Url,
                        ImageFormat::Base64 => ImageEncoding::Base64,
                    },
                    image_mime: None,
                    trailing_text: self.trailing_text_messages(group),
                    target_intimacy: self.target_intimacy(request),
                    known_dimensions: None,
                },
                &self.dimension_fetcher,
            )
            .await;

        let dialogs = outcome
            .bubble_dialogs
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|dialog| DialogItem {
                position: [dialog.position.x1, dialog.position.y1, dialog.position.x2, dialog.position.y2],
                text: dialog.text,
                from_user: dialog.sender == "user",
                speaker: dialog.sender,
            })
            .collect();

        let image_result = ImageResult { content: url.to_string(), dialogs, scenario: self.serialize_scenario(request, &outcome) };
        let suggested_reply = outcome.generation.replies.first().map(|reply| reply.text.clone());
        Ok(ResolvedGroup { image_result, suggested_reply })
    }

    /// A group with no image at all: the content is free text, so it becomes
    /// a pseudo `ImageResult` carrying that text as a single dialog (spec
    /// §4.6 step 3, "Non-URL items become a pseudo-ImageResult").
    async fn resolve_text_group(&self, request: &PredictRequest, group: &AnalysisGroup) -> Result<ResolvedGroup, CoordinatorError> {
        let joined = group.texts.join(" ");
        let conversation = vec![Message { id: "text-only".to_string(), speaker: "user".to_string(), content: joined.clone(), timestamp: None }];

        let outcome = self
            .orchestrator
            .run_mode_a(ModeARequest {
                request_id: request.request_id.clone().unwrap_or_default(),
                session_id: request.session_id.clone(),
                user_id: request.user_id.clone(),
                conversation,
                target_intimacy: self.target_intimacy(request),
            })
            .await;

        let dialog = DialogItem { position: [0.0, 0.0, 0.0, 0.0], text: joined.clone(), speaker: "user".to_string(), from_user: true };
        let image_result = ImageResult { content: joined, dialogs: vec![dialog], scenario: self.serialize_scenario(request, &outcome) };
        let suggested_reply = outcome.generation.replies.first().map(|reply| reply.text.clone());
        Ok(ResolvedGroup { image_result, suggested_reply })
    }

    fn trailing_text_messages(&self, group: &AnalysisGroup) -> Vec<Message> {
        group
            .texts
            .iter()
            .enumerate()
            .map(|(index, text)| Message { id: format!("text-{index}"), speaker: "user".to_string(), content: text.clone(), timestamp: None })
            .collect()
    }

    fn serialize_scenario(&self, request: &PredictRequest, outcome: &ModeAOutcome) -> String {
        if !request.scene_analysis {
            return String::new();
        }
        outcome.scene.as_ref().and_then(|scene| serde_json::to_string(scene).ok()).unwrap_or_default()
    }
}
