//! File-backed prompt version store (spec §4.2, C2).
//!
//! Layout under `root`:
//! - `versions/<type>_<version>.txt` — prompt body.
//! - `versions/<type>_<version>.meta.json` — `PromptVersionMeta`.
//! - `registry.json` — `{type -> active version}` index.
//! - `active/<type>` — shadow file holding the active content, rewritten in
//!   one atomic rename on `activate` so readers never observe a half-swap.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::PromptVersion;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersionMeta {
    pub prompt_id: String,
    pub version: String,
    pub token_estimate: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub parent_version: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryIndex {
    active: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Ok,
    Missing,
}

/// Rough token estimate: characters / 4, matching the back-of-envelope
/// heuristic the original prompt manager uses for budgeting.
pub fn estimate_tokens(content: &str) -> u32 {
    (content.chars().count() as u32 / 4).max(1)
}

pub struct PromptRegistry {
    root: PathBuf,
    index: RwLock<RegistryIndex>,
}

impl PromptRegistry {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("versions"))?;
        std::fs::create_dir_all(root.join("active"))?;

        let index_path = root.join("registry.json");
        let index = if index_path.exists() {
            let raw = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            RegistryIndex::default()
        };

        Ok(Self { root, index: RwLock::new(index) })
    }

    fn version_content_path(&self, prompt_type: &str, version: &str) -> PathBuf {
        self.root.join("versions").join(format!("{prompt_type}_{version}.txt"))
    }

    fn version_meta_path(&self, prompt_type: &str, version: &str) -> PathBuf {
        self.root.join("versions").join(format!("{prompt_type}_{version}.meta.json"))
    }

    fn active_shadow_path(&self, prompt_type: &str) -> PathBuf {
        self.root.join("active").join(prompt_type)
    }

    fn persist_index(&self) -> Result<()> {
        let index = self.index.read().unwrap();
        let rendered = serde_json::to_string_pretty(&*index)?;
        std::fs::write(self.root.join("registry.json"), rendered)?;
        Ok(())
    }

    /// Registers a new version. Does not activate it.
    pub fn register(
        &self,
        prompt_type: &str,
        version: &str,
        content: &str,
        parent_version: Option<String>,
    ) -> Result<String> {
        let prompt_id = PromptVersion::make_id(prompt_type, version);
        std::fs::write(self.version_content_path(prompt_type, version), content)
            .with_context(|| format!("writing prompt content for {prompt_id}"))?;

        let meta = PromptVersionMeta {
            prompt_id: prompt_id.clone(),
            version: version.to_string(),
            token_estimate: estimate_tokens(content),
            is_active: false,
            created_at: Utc::now(),
            parent_version,
        };
        std::fs::write(
            self.version_meta_path(prompt_type, version),
            serde_json::to_string_pretty(&meta)?,
        )?;

        Ok(prompt_id)
    }

    /// Rewrites the `active/<type>` shadow file in one step, then updates the
    /// index. Alias: `rollback`.
    pub fn activate(&self, prompt_type: &str, version: &str) -> Result<ActivationOutcome> {
        let content_path = self.version_content_path(prompt_type, version);
        if !content_path.exists() {
            return Ok(ActivationOutcome::Missing);
        }
        let content = std::fs::read_to_string(&content_path)?;

        let shadow = self.active_shadow_path(prompt_type);
        let tmp = shadow.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, &shadow)?;

        self.index.write().unwrap().active.insert(prompt_type.to_string(), version.to_string());
        self.persist_index()?;

        Ok(ActivationOutcome::Ok)
    }

    pub fn rollback(&self, prompt_type: &str, version: &str) -> Result<ActivationOutcome> {
        self.activate(prompt_type, version)
    }

    /// Copy-on-read: returns an owned `String`, never a handle into the
    /// shadow file, so a concurrent activation cannot tear a reader's view.
    pub fn active(&self, prompt_type: &str) -> Option<String> {
        std::fs::read_to_string(self.active_shadow_path(prompt_type)).ok()
    }

    pub fn get(&self, prompt_type: &str, version: &str) -> Option<String> {
        std::fs::read_to_string(self.version_content_path(prompt_type, version)).ok()
    }

    pub fn compare(&self, prompt_type: &str, v1: &str, v2: &str) -> Option<(i64, i64)> {
        let c1 = self.get(prompt_type, v1)?;
        let c2 = self.get(prompt_type, v2)?;
        let len_delta = c2.len() as i64 - c1.len() as i64;
        let token_delta = estimate_tokens(&c2) as i64 - estimate_tokens(&c1) as i64;
        Some((len_delta, token_delta))
    }

    pub fn list_versions(&self, prompt_type: &str) -> Vec<PromptVersionMeta> {
        let active_version = self.index.read().unwrap().active.get(prompt_type).cloned();
        let prefix = format!("{prompt_type}_");
        let dir = self.root.join("versions");

        let Ok(entries) = std::fs::read_dir(&dir) else {
            return vec![];
        };

        let mut metas = vec![];
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !file_name.starts_with(&prefix) || !file_name.ends_with(".meta.json") {
                continue;
            }
            if let Ok(raw) = std::fs::read_to_string(entry.path()) {
                if let Ok(mut meta) = serde_json::from_str::<PromptVersionMeta>(&raw) {
                    meta.is_active = active_version.as_deref() == Some(meta.version.as_str());
                    metas.push(meta);
                }
            }
        }
        metas.sort_by(|a, b| a.version.cmp(&b.version));
        metas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_registry() -> (PromptRegistry, PathBuf) {
        let dir = std::env::temp_dir().join(format!("chatcoach-registry-{}", uuid::Uuid::new_v4()));
        (PromptRegistry::open(&dir).unwrap(), dir)
    }

    #[test]
    fn register_then_activate_makes_content_readable() {
        let (registry, dir) = temp_registry();
        registry.register("scene", "v1", "scene prompt body", None).unwrap();
        assert!(registry.active("scene").is_none());

        let outcome = registry.activate("scene", "v1").unwrap();
        assert_eq!(outcome, ActivationOutcome::Ok);
        assert_eq!(registry.active("scene").unwrap(), "scene prompt body");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn at_most_one_active_version_per_type() {
        let (registry, dir) = temp_registry();
        registry.register("scene", "v1", "body one", None).unwrap();
        registry.register("scene", "v2", "body two", Some("v1".to_string())).unwrap();

        registry.activate("scene", "v1").unwrap();
        registry.activate("scene", "v2").unwrap();

        assert_eq!(registry.active("scene").unwrap(), "body two");
        let versions = registry.list_versions("scene");
        let active_count = versions.iter().filter(|v| v.is_active).count();
        assert_eq!(active_count, 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn activating_missing_version_reports_missing() {
        let (registry, dir) = temp_registry();
        let outcome = registry.activate("scene", "nope").unwrap();
        assert_eq!(outcome, ActivationOutcome::Missing);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn compare_reports_len_and_token_delta() {
        let (registry, dir) = temp_registry();
        registry.register("scene", "v1", "short", None).unwrap();
        registry.register("scene", "v2", "a much longer prompt body here", None).unwrap();

        let (len_delta, token_delta) = registry.compare("scene", "v1", "v2").unwrap();
        assert!(len_delta > 0);
        assert!(token_delta > 0);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn rollback_is_an_alias_of_activate() {
        let (registry, dir) = temp_registry();
        registry.register("scene", "v1", "body one", None).unwrap();
        registry.register("scene", "v2", "body two", None).unwrap();
        registry.activate("scene", "v2").unwrap();
        registry.rollback("scene", "v1").unwrap();
        assert_eq!(registry.active("scene").unwrap(), "body one");
        let _ = std::fs::remove_dir_all(dir);
    }
}
