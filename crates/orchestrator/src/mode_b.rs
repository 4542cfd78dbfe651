//! Mode B: the merge-step pipeline (spec §4.5 "Mode B — Merge step").
//!
//! A single multimodal call replaces stage (1)+(2)+part of (4): given the
//! image and one prompt, the model must emit a compound JSON carrying
//! `screenshot_parse` (bubbles with bboxes and sender), `conversation_summary`,
//! and `scene`. The pipeline then resumes at stage (3) via
//! [`Orchestrator::resume_from_scene`].

use chatcoach_collab::{DimensionFetcher, ImageDimensions};
use chatcoach_llm::{ImageEncoding, ImageInput, LlmCall, Quality, TaskType};
use chatcoach_prompt::codec::expand_scene_analysis;
use chatcoach_prompt::extract::extract_json;
use chatcoach_prompt::types::{ConversationContext, EmotionState, Message};

use crate::mode_a::{ModeAOutcome, ModeARequest, Orchestrator};

pub struct ModeBRequest {
    pub request_id: String,
    pub session_id: String,
    pub user_id: String,
    pub image_url: String,
    pub image_encoding: ImageEncoding,
    pub image_mime: Option<String>,
    pub trailing_text: Vec<Message>,
    pub target_intimacy: u8,
    /// Real pixel dimensions for this resource, if a prior background fetch
    /// already resolved them; `None` falls back to the 1080x1920 placeholder.
    pub known_dimensions: Option<ImageDimensions>,
}

/// A bbox normalised to `[0,1]` with `x1<=x2`, `y1<=y2` (spec §4.5, §8 property 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBbox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone)]
pub struct ParsedDialog {
    pub position: NormalizedBbox,
    pub text: String,
    pub sender: String,
}

fn normalize_bbox(bbox: &serde_json::Value, dims: ImageDimensions) -> Option<NormalizedBbox> {
    let x1 = bbox["x1"].as_f64()?;
    let y1 = bbox["y1"].as_f64()?;
    let x2 = bbox["x2"].as_f64()?;
    let y2 = bbox["y2"].as_f64()?;

    let clamp01 = |value: f64| value.clamp(0.0, 1.0);
    let (nx1, nx2) = {
        let a = clamp01(x1 / dims.width as f64);
        let b = clamp01(x2 / dims.width as f64);
        (a.min(b), a.max(b))
    };
    let (ny1, ny2) = {
        let a = clamp01(y1 / dims.height as f64);
        let b = clamp01(y2 / dims.height as f64);
        (a.min(b), a.max(b))
    };

    Some(NormalizedBbox { x1: nx1, y1: ny1, x2: nx2, y2: ny2 })
}

impl Orchestrator {
    pub async fn run_mode_b(&self, request: ModeBRequest, dimension_fetcher: &DimensionFetcher) -> ModeAOutcome {
        let dims = request.known_dimensions.unwrap_or_else(ImageDimensions::placeholder);
        if request.known_dimensions.is_none() {
            self.spawn_dimension_fetch(request.image_url.clone(), dimension_fetcher);
        }

        let prompt = format!(
            "Parse this conversation screenshot and analyse the relationship scene in one pass. \
             Respond with JSON only: {{\"screenshot_parse\":{{\"bubbles\":[{{\"bbox\":{{\"x1\":0,\"y1\":0,\"x2\":0,\"y2\":0}},\"text\":\"...\",\"sender\":\"user|talker\"}}]}},\
             \"conversation_summary\":\"...\",\"scene\":{{\"rs\":\"I|P|V|E\",\"sc\":\"S|B|R|C|N\",\"il\":0-100,\"cs\":\"S|B|R|C|N\",\"rc\":\"S|B|R|C|N\",\"st\":[],\"rf\":[]}}}}"
        );

        let mut call = LlmCall::new(TaskType::MergeStep, prompt, Quality::Normal, &request.user_id);
        call = call.with_image(ImageInput {
            data: request.image_url.clone(),
            encoding: request.image_encoding,
            mime: request.image_mime.clone(),
        });

        let llm_result = match self.llm().call(call).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, request_id = %request.request_id, "merge-step call failed, aborting pipeline attempt");
                return self.exhausted_outcome(ConversationContext::unavailable_default(), None, None);
            }
        };

        let value = match extract_json(&llm_result.text) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, request_id = %request.request_id, "merge-step reply unparseable, aborting pipeline attempt");
                return self.exhausted_outcome(ConversationContext::unavailable_default(), None, None);
            }
        };

        let scene = expand_scene_analysis(&value["scene"]);

        let dialogs: Vec<ParsedDialog> = value["screenshot_parse"]["bubbles"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|bubble| {
                let position = normalize_bbox(&bubble["bbox"], dims)?;
                Some(ParsedDialog {
                    position,
                    text: bubble["text"].as_str().unwrap_or_default().to_string(),
                    sender: bubble["sender"].as_str().unwrap_or("talker").to_string(),
                })
            })
            .collect();

        let mut conversation: Vec<Message> = dialogs
            .iter()
            .enumerate()
            .map(|(i, dialog)| Message {
                id: format!("bubble-{i}"),
                speaker: dialog.sender.clone(),
                content: dialog.text.clone(),
                timestamp: None,
            })
            .collect();
        conversation.extend(request.trailing_text.clone());

        let context = ConversationContext {
            summary: value["conversation_summary"].as_str().unwrap_or_default().to_string(),
            emotion_state: EmotionState::Neutral,
            current_intimacy_level: scene.intimacy_level,
            risk_flags: scene.risk_flags.clone(),
            conversation,
            history_summary: None,
        };

        let mode_a_request = ModeARequest {
            request_id: request.request_id,
            session_id: request.session_id,
            user_id: request.user_id,
            conversation: context.conversation.clone(),
            target_intimacy: request.target_intimacy,
        };

        let mut outcome = self.resume_from_scene(&mode_a_request, context, scene).await;
        outcome.bubble_dialogs = Some(dialogs);
        outcome
    }

    /// Fires a best-effort background fetch for this resource's real
    /// dimensions so a later request can skip the placeholder (spec §4.5
    /// Mode B, §5 "Background ... tasks are detached").
    fn spawn_dimension_fetch(&self, image_url: String, dimension_fetcher: &DimensionFetcher) {
        let fetcher = dimension_fetcher.clone();
        tokio::spawn(async move {
            if let Err(err) = fetcher.fetch(&image_url).await {
                tracing::debug!(error = %err, image_url, "background image dimension fetch failed");
            }
        });
    }
}
