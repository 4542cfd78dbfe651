//! Response shapes returned by `/predict` (spec §6.1).

use serde::{Deserialize, Serialize};

use crate::request::PredictRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogItem {
    /// `[minX, minY, maxX, maxY]`, each in `[0,1]`, `minX<=maxX`, `minY<=maxY`.
    pub position: [f64; 4],
    pub text: String,
    pub speaker: String,
    pub from_user: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    pub content: String,
    pub dialogs: Vec<DialogItem>,
    /// JSON-serialised `SceneAnalysisResult`, or `""` when scene analysis
    /// wasn't requested for this group.
    pub scenario: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub request_id: Option<String>,
    pub session_id: String,
    pub scene: u8,
    pub results: Vec<ImageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_replies: Option<Vec<String>>,
}

impl PredictResponse {
    pub fn success(request_id: String, request: &PredictRequest) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            user_id: request.user_id.clone(),
            request_id: Some(request_id),
            session_id: request.session_id.clone(),
            scene: request.scene,
            results: Vec::new(),
            suggested_replies: None,
        }
    }
}
