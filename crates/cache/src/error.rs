use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("scene mismatch: session previously labelled {previous}, request carries {requested}")]
    SceneMismatch { previous: u8, requested: u8 },

    #[error("cache backend unavailable: {0}")]
    BackendUnavailable(String),
}
