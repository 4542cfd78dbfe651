//! Optional Redis mirror (spec §4.4 "bind to / release an optional Redis
//! back-end"). Enrichment: `redis` usage pattern grounded on
//! `other_examples/manifests/gobenpark-talk` and `AnthonyRonning-sage`.
//! Best-effort only: every method swallows connection errors into
//! `CacheError::BackendUnavailable` rather than failing the request path.

use crate::error::CacheError;

#[cfg(feature = "redis-backend")]
use redis::aio::ConnectionManager;

/// Thin wrapper around an async Redis connection. Present (compiled in)
/// only under the `redis-backend` feature; `SessionCache` works identically
/// without it.
pub struct RedisMirror {
    #[cfg(feature = "redis-backend")]
    manager: ConnectionManager,
    #[cfg(not(feature = "redis-backend"))]
    _unused: (),
}

impl RedisMirror {
    #[cfg(feature = "redis-backend")]
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(|err| CacheError::BackendUnavailable(err.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|err| CacheError::BackendUnavailable(err.to_string()))?;
        Ok(Self { manager })
    }

    #[cfg(feature = "redis-backend")]
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| CacheError::BackendUnavailable(err.to_string()))
    }

    #[cfg(feature = "redis-backend")]
    pub async fn close(&self) {}

    #[cfg(not(feature = "redis-backend"))]
    pub async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    #[cfg(not(feature = "redis-backend"))]
    pub async fn close(&self) {}
}
