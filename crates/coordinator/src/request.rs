//! The `/predict` request shape (spec §6.1) and its validation pass
//! (spec §4.6 step 1).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatcoach_config::AppConfig;

use crate::error::CoordinatorError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictRequest {
    pub content: Vec<String>,
    pub language: String,
    pub scene: u8,
    pub user_id: String,
    pub session_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub other_properties: String,
    #[serde(default)]
    pub conf_threshold: Option<f64>,
    #[serde(default)]
    pub reply: bool,
    #[serde(default)]
    pub scene_analysis: bool,
}

impl PredictRequest {
    /// `language`, `scene`, non-empty `content`/`session_id`/`user_id` (spec
    /// §4.6 step 1). Returns the request-id to use downstream, generating
    /// one when the caller didn't supply it.
    pub fn validate(&self, config: &AppConfig) -> Result<String, CoordinatorError> {
        if self.content.is_empty() {
            return Err(CoordinatorError::Validation("content must contain at least one item".to_string()));
        }
        if !config.is_language_supported(&self.language) {
            return Err(CoordinatorError::Validation(format!("unsupported language: {}", self.language)));
        }
        if !(1..=3).contains(&self.scene) {
            return Err(CoordinatorError::Validation(format!("scene must be 1, 2, or 3, got {}", self.scene)));
        }
        if self.user_id.trim().is_empty() {
            return Err(CoordinatorError::Validation("user_id must not be empty".to_string()));
        }
        if self.session_id.trim().is_empty() {
            return Err(CoordinatorError::Validation("session_id must not be empty".to_string()));
        }
        if let Some(threshold) = self.conf_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(CoordinatorError::Validation(format!("conf_threshold must be in [0,1], got {threshold}")));
            }
        }
        canonicalize_other_properties(&self.other_properties)?;

        Ok(self.request_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()))
    }
}

/// Re-serialises `other_properties` canonically (spec §6.1's field note).
/// `""` is allowed and passes through unchanged; anything else must be
/// valid JSON.
pub fn canonicalize_other_properties(raw: &str) -> Result<String, CoordinatorError> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|err| CoordinatorError::Validation(format!("other_properties is not valid JSON: {err}")))?;
    serde_json::to_string(&value).map_err(|err| CoordinatorError::Validation(format!("other_properties could not be re-serialised: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PredictRequest {
        PredictRequest {
            content: vec!["hello".to_string()],
            language: "en".to_string(),
            scene: 2,
            user_id: "u1".to_string(),
            session_id: "s1".to_string(),
            request_id: None,
            other_properties: String::new(),
            conf_threshold: None,
            reply: false,
            scene_analysis: false,
        }
    }

    #[test]
    fn valid_request_assigns_a_request_id_when_absent() {
        let request = sample();
        let id = request.validate(&AppConfig::default()).unwrap();
        assert!(!id.is_empty());
    }

    #[test]
    fn empty_content_is_rejected() {
        let mut request = sample();
        request.content = vec![];
        assert!(matches!(request.validate(&AppConfig::default()), Err(CoordinatorError::Validation(_))));
    }

    #[test]
    fn unsupported_language_is_rejected() {
        let mut request = sample();
        request.language = "xx".to_string();
        assert!(matches!(request.validate(&AppConfig::default()), Err(CoordinatorError::Validation(_))));
    }

    #[test]
    fn scene_out_of_range_is_rejected() {
        let mut request = sample();
        request.scene = 9;
        assert!(matches!(request.validate(&AppConfig::default()), Err(CoordinatorError::Validation(_))));
    }

    #[test]
    fn other_properties_canonicalizes_key_order() {
        let canonical = canonicalize_other_properties(r#"{"b":1,"a":2}"#).unwrap();
        assert_eq!(canonical, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn empty_other_properties_passes_through() {
        assert_eq!(canonicalize_other_properties("").unwrap(), "");
    }

    #[test]
    fn malformed_other_properties_is_rejected() {
        let mut request = sample();
        request.other_properties = "{not json".to_string();
        assert!(matches!(request.validate(&AppConfig::default()), Err(CoordinatorError::Validation(_))));
    }
}
