//! Coordinator-local error taxonomy and its 1:1 mapping onto the status
//! codes of spec §6.1 ("Status codes: 200 success; 400 validation / no
//! dialog / scene mismatch / bad image; 401 model unavailable; 402
//! quota/cost; 500 orchestration/LLM failure; 502 cache backend error; 503
//! collaborator unavailable; 504 timeout").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// Reply was requested but the anchor-selection rule (spec §4.6 step 4)
    /// found no counterpart line to respond to.
    #[error("no dialog available to anchor a reply")]
    NoDialogForReply,

    #[error("session {session_id} was previously locked to scene {previous}, rejecting scene {requested}")]
    SceneMismatch { session_id: String, previous: u8, requested: u8 },

    #[error("image could not be loaded: {0}")]
    BadImage(String),

    #[error("no provider available for this request")]
    ModelUnavailable,

    #[error("per-user quota exceeded")]
    QuotaExceeded,

    #[error("orchestration failed: {0}")]
    Orchestration(String),

    #[error("cache backend unavailable: {0}")]
    CacheBackend(String),

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("collaborator timed out: {0}")]
    Timeout(String),
}

impl CoordinatorError {
    pub fn status_code(&self) -> u16 {
        match self {
            CoordinatorError::Validation(_) | CoordinatorError::NoDialogForReply | CoordinatorError::SceneMismatch { .. } | CoordinatorError::BadImage(_) => 400,
            CoordinatorError::ModelUnavailable => 401,
            CoordinatorError::QuotaExceeded => 402,
            CoordinatorError::Orchestration(_) => 500,
            CoordinatorError::CacheBackend(_) => 502,
            CoordinatorError::CollaboratorUnavailable(_) => 503,
            CoordinatorError::Timeout(_) => 504,
        }
    }
}

impl From<chatcoach_cache::CacheError> for CoordinatorError {
    fn from(err: chatcoach_cache::CacheError) -> Self {
        match err {
            chatcoach_cache::CacheError::SceneMismatch { previous, requested } => {
                CoordinatorError::SceneMismatch { session_id: String::new(), previous, requested }
            }
            chatcoach_cache::CacheError::BackendUnavailable(msg) => CoordinatorError::CacheBackend(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_spec_table() {
        assert_eq!(CoordinatorError::Validation("x".into()).status_code(), 400);
        assert_eq!(CoordinatorError::NoDialogForReply.status_code(), 400);
        assert_eq!(CoordinatorError::SceneMismatch { session_id: "s".into(), previous: 1, requested: 2 }.status_code(), 400);
        assert_eq!(CoordinatorError::ModelUnavailable.status_code(), 401);
        assert_eq!(CoordinatorError::QuotaExceeded.status_code(), 402);
        assert_eq!(CoordinatorError::Orchestration("x".into()).status_code(), 500);
        assert_eq!(CoordinatorError::CacheBackend("x".into()).status_code(), 502);
        assert_eq!(CoordinatorError::CollaboratorUnavailable("x".into()).status_code(), 503);
        assert_eq!(CoordinatorError::Timeout("x".into()).status_code(), 504);
    }
}
