//! Session-categorised cache (spec §4.4, C4).
//!
//! Key: `(session_id, category, resource, scene)`. Value: an ordered list of
//! `CacheEvent`s with a strictly-increasing `seq`. Appends are serialised per
//! key via `dashmap`'s per-shard locking (grounded on the teacher's
//! append-only event log in `crates/memory/src/event_log.rs`, here backed by
//! an in-memory map instead of a file since cache state is explicitly
//! best-effort/non-durable, spec §3 "Ownership and lifecycle").

mod backend;
mod error;

pub use backend::RedisMirror;
pub use error::CacheError;

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed category vocabulary (DESIGN.md open-question decision #1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    ImageResult,
    SceneType,
    ImageDimensions,
}

impl CacheCategory {
    fn as_str(self) -> &'static str {
        match self {
            CacheCategory::ImageResult => "image_result",
            CacheCategory::SceneType => "scene_type",
            CacheCategory::ImageDimensions => "image_dimensions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session_id: String,
    pub category: CacheCategory,
    pub resource: String,
    pub scene: u8,
}

impl CacheKey {
    pub fn new(session_id: impl Into<String>, category: CacheCategory, resource: impl Into<String>, scene: u8) -> Self {
        Self {
            session_id: session_id.into(),
            category,
            resource: resource.into(),
            scene,
        }
    }

    fn shard_key(&self) -> String {
        format!("{}\u{1f}{}\u{1f}{}\u{1f}{}", self.session_id, self.category.as_str(), self.resource, self.scene)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEvent {
    pub session_id: String,
    pub category: String,
    pub resource: String,
    pub scene: u8,
    pub payload: Value,
    pub seq: u64,
    pub ts: DateTime<Utc>,
}

#[derive(Default)]
struct Bucket {
    events: Vec<CacheEvent>,
    next_seq: u64,
    /// Payload hashes seen recently, for idempotent-append detection
    /// (spec §4.4: "idempotent on (key, exact-payload) within a short window").
    recent_payloads: Vec<String>,
}

/// Normalises `scene` per spec §4.4 ("3 -> 1") for the consistency gate.
pub fn normalize_scene(scene: u8) -> u8 {
    if scene == 3 {
        1
    } else {
        scene
    }
}

/// Session-categorised cache. Scene-consistency is enforced via a dedicated
/// `scene_type`/`__scene__` bucket per session (spec §4.4).
pub struct SessionCache {
    buckets: DashMap<String, RwLock<Bucket>>,
    mirror: Option<RedisMirror>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self { buckets: DashMap::new(), mirror: None }
    }

    #[cfg(feature = "redis-backend")]
    pub fn with_mirror(mirror: RedisMirror) -> Self {
        Self { buckets: DashMap::new(), mirror: Some(mirror) }
    }

    /// Best-effort bind to the optional Redis back-end; never blocks the
    /// request path if unreachable (spec §4.4 "start()/stop()").
    pub async fn start(&self) {
        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.ping().await {
                tracing::warn!(error = %err, "cache redis mirror unreachable at start; degrading to in-process only");
            }
        }
    }

    pub async fn stop(&self) {
        if let Some(mirror) = &self.mirror {
            mirror.close().await;
        }
    }

    /// Appends with the next `seq`. Idempotent on `(key, exact-payload)`:
    /// if the most recent event under this key carries byte-identical
    /// payload, the append is a no-op and the existing event is returned.
    pub fn append_event(&self, key: &CacheKey, payload: Value) -> CacheEvent {
        let shard_key = key.shard_key();
        let entry = self.buckets.entry(shard_key).or_default();
        let mut bucket = entry.write().unwrap();

        let payload_hash = payload.to_string();
        if bucket.recent_payloads.last() == Some(&payload_hash) {
            if let Some(last) = bucket.events.last() {
                return last.clone();
            }
        }

        let seq = bucket.next_seq;
        bucket.next_seq += 1;
        let event = CacheEvent {
            session_id: key.session_id.clone(),
            category: key.category.as_str().to_string(),
            resource: key.resource.clone(),
            scene: key.scene,
            payload,
            seq,
            ts: Utc::now(),
        };
        bucket.events.push(event.clone());
        bucket.recent_payloads.push(payload_hash);
        if bucket.recent_payloads.len() > 8 {
            bucket.recent_payloads.remove(0);
        }
        event
    }

    pub fn get_resource_category_last(&self, key: &CacheKey) -> Option<CacheEvent> {
        let shard_key = key.shard_key();
        let entry = self.buckets.get(&shard_key)?;
        let bucket = entry.read().unwrap();
        bucket.events.iter().max_by_key(|e| e.seq).cloned()
    }

    pub fn get_events(&self, key: &CacheKey) -> Vec<CacheEvent> {
        let shard_key = key.shard_key();
        match self.buckets.get(&shard_key) {
            Some(entry) => {
                let bucket = entry.read().unwrap();
                let mut events = bucket.events.clone();
                events.sort_by_key(|e| e.seq);
                events
            }
            None => vec![],
        }
    }

    pub fn list_resources(&self, session_id: &str, scene: u8, limit: usize) -> Vec<String> {
        let prefix = format!("{}\u{1f}{}\u{1f}", session_id, CacheCategory::ImageResult.as_str());
        let mut resources = vec![];
        for entry in self.buckets.iter() {
            let shard_key = entry.key();
            if !shard_key.starts_with(&prefix) {
                continue;
            }
            let bucket = entry.value().read().unwrap();
            if let Some(event) = bucket.events.first() {
                if event.scene == scene {
                    resources.push(event.resource.clone());
                }
            }
            if resources.len() >= limit {
                break;
            }
        }
        resources
    }

    /// Scene-consistency invariant (spec §4.4). On first sight, records the
    /// normalised scene; on a mismatch, returns `Err(CacheError::SceneMismatch)`.
    pub fn check_scene_consistency(&self, session_id: &str, scene: u8) -> Result<(), CacheError> {
        let normalized = normalize_scene(scene);
        let key = CacheKey::new(session_id, CacheCategory::SceneType, "__scene__", 0);

        if let Some(event) = self.get_resource_category_last(&key) {
            let previous = event.payload.as_u64().unwrap_or(u64::MAX) as u8;
            if previous != normalized {
                return Err(CacheError::SceneMismatch { previous, requested: normalized });
            }
            return Ok(());
        }

        self.append_event(&key, Value::from(normalized));
        Ok(())
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
