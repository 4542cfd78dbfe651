use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{
    AuditSink, FailedReplyLog, GenerationResultLog, IntimacyCheckLog, LlmCallLog,
    PersonaSnapshotLog, SceneAnalysisLog,
};

/// Appends every record kind to its own JSONL file under `dir`, one line per
/// record. Writes are serialised with an internal lock per file so
/// concurrent callers never interleave partial lines; each line is a
/// complete `write_all` + `flush` before the lock releases.
pub struct JsonlAuditSink {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    async fn append_line<T: Serialize>(&self, file_name: &str, record: &T) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, file_name, "failed to serialize audit record");
                return;
            }
        };

        let _guard = self.lock.lock().await;
        if let Err(err) = write_line(&self.dir, file_name, &line).await {
            tracing::warn!(error = %err, file_name, "failed to append audit record");
        }
    }
}

async fn write_line(dir: &Path, file_name: &str, line: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn scene_analysis(&self, record: SceneAnalysisLog) {
        self.append_line("scene_analysis_log.jsonl", &record).await;
    }

    async fn persona_snapshot(&self, record: PersonaSnapshotLog) {
        self.append_line("persona_snapshot.jsonl", &record).await;
    }

    async fn llm_call(&self, record: LlmCallLog) {
        self.append_line("llm_call_log.jsonl", &record).await;
    }

    async fn intimacy_check(&self, record: IntimacyCheckLog) {
        self.append_line("intimacy_check_log.jsonl", &record).await;
    }

    async fn generation_result(&self, record: GenerationResultLog) {
        self.append_line("generation_result.jsonl", &record).await;
    }

    async fn failed_reply(&self, record: FailedReplyLog) {
        self.append_line("failed_json_replies.jsonl", &record).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SceneAnalysisLog;

    #[tokio::test]
    async fn appends_one_line_per_record() {
        let dir = std::env::temp_dir().join(format!("chatcoach-audit-test-{}", uuid::Uuid::new_v4()));
        let sink = JsonlAuditSink::new(&dir);

        sink.scene_analysis(SceneAnalysisLog::new(
            "req-1", "sess-1", "ignition", "SAFE", 10, vec![], vec![],
        ))
        .await;
        sink.scene_analysis(SceneAnalysisLog::new(
            "req-2", "sess-1", "propulsion", "BALANCED", 30, vec![], vec![],
        ))
        .await;

        let content = tokio::fs::read_to_string(dir.join("scene_analysis_log.jsonl"))
            .await
            .unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains("req-1"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
