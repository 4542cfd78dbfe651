//! Append-only persistence sinks (spec §6.4, SPEC_FULL §11).
//!
//! These are write-only from the core's perspective: the pipeline never
//! reads a record back. Each sink is a small `async-trait` so the
//! coordinator/orchestrator can depend on `Arc<dyn AuditSink>` without
//! caring whether records land in a JSONL file, a database, or nowhere
//! (`NullAuditSink`, used in tests).

mod jsonl;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use jsonl::JsonlAuditSink;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneAnalysisLog {
    pub id: String,
    pub request_id: String,
    pub session_id: String,
    pub relationship_state: String,
    pub scenario: String,
    pub intimacy_level: u8,
    pub recommended_strategies: Vec<String>,
    pub risk_flags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SceneAnalysisLog {
    pub fn new(
        request_id: impl Into<String>,
        session_id: impl Into<String>,
        relationship_state: impl Into<String>,
        scenario: impl Into<String>,
        intimacy_level: u8,
        recommended_strategies: Vec<String>,
        risk_flags: Vec<String>,
    ) -> Self {
        Self {
            id: new_id(),
            request_id: request_id.into(),
            session_id: session_id.into(),
            relationship_state: relationship_state.into(),
            scenario: scenario.into(),
            intimacy_level,
            recommended_strategies,
            risk_flags,
            created_at: now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaSnapshotLog {
    pub id: String,
    pub request_id: String,
    pub user_id: String,
    pub style: String,
    pub pacing: String,
    pub risk_tolerance: String,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

impl PersonaSnapshotLog {
    pub fn new(
        request_id: impl Into<String>,
        user_id: impl Into<String>,
        style: impl Into<String>,
        pacing: impl Into<String>,
        risk_tolerance: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            id: new_id(),
            request_id: request_id.into(),
            user_id: user_id.into(),
            style: style.into(),
            pacing: pacing.into(),
            risk_tolerance: risk_tolerance.into(),
            confidence,
            created_at: now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallLog {
    pub id: String,
    pub request_id: String,
    pub user_id: String,
    pub task_type: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub succeeded: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntimacyCheckLog {
    pub id: String,
    pub request_id: String,
    pub session_id: String,
    pub passed: bool,
    pub score: f32,
    pub per_dimension_scores: Vec<f32>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResultLog {
    pub id: String,
    pub request_id: String,
    pub session_id: String,
    pub attempt: u32,
    pub fallback: bool,
    pub reply_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Raw-text capture when every JSON extraction strategy fails (SPEC_FULL §11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedReplyLog {
    pub id: String,
    pub request_id: String,
    pub task_type: String,
    pub raw_preview: String,
    pub created_at: DateTime<Utc>,
}

impl FailedReplyLog {
    pub fn new(request_id: impl Into<String>, task_type: impl Into<String>, raw: &str) -> Self {
        let preview: String = raw.chars().take(200).collect();
        Self {
            id: new_id(),
            request_id: request_id.into(),
            task_type: task_type.into(),
            raw_preview: preview,
            created_at: now(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn scene_analysis(&self, _record: SceneAnalysisLog) {}
    async fn persona_snapshot(&self, _record: PersonaSnapshotLog) {}
    async fn llm_call(&self, _record: LlmCallLog) {}
    async fn intimacy_check(&self, _record: IntimacyCheckLog) {}
    async fn generation_result(&self, _record: GenerationResultLog) {}
    async fn failed_reply(&self, _record: FailedReplyLog) {}
}

/// Drops every record. Used in tests and as a default when no durable sink
/// is configured; the pipeline must work identically with or without one.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {}
