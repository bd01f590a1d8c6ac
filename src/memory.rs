//! Per-agent memory with a bounded short-term buffer and a persisted
//! long-term map.
//!
//! Short-term entries accumulate until the buffer exceeds its cap, at which
//! point the highest-importance entries are consolidated into long-term
//! storage and the buffer is cleared. Long-term entries are written one JSON
//! file per key under the store's directory. The files are write-only:
//! nothing reads them back at startup, so `recall` only sees entries added
//! during the current process lifetime.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agent::types::{AgentStatus, AgentThought};

/// Short-term entries beyond this count trigger consolidation.
const SHORT_TERM_CAP: usize = 100;

/// How many of the highest-importance entries survive consolidation.
const CONSOLIDATE_KEEP: usize = 10;

/// One remembered item. `importance` ranges over 0.0..=1.0 and decides
/// which entries survive consolidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub importance: f64,
}

impl MemoryEntry {
    pub fn new(
        kind: impl Into<String>,
        content: impl Into<String>,
        metadata: Map<String, Value>,
        importance: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            kind: kind.into(),
            content: content.into(),
            metadata,
            timestamp: Utc::now(),
            importance,
        }
    }
}

/// Two-tier memory for a single agent.
pub struct MemoryStore {
    storage_dir: PathBuf,
    short_term: RwLock<Vec<MemoryEntry>>,
    long_term: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Create a store rooted at `storage_dir`. The directory is created
    /// lazily on first persist, so construction never fails.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            short_term: RwLock::new(Vec::new()),
            long_term: RwLock::new(HashMap::new()),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Append to the short-term buffer, consolidating when the cap is
    /// exceeded.
    pub async fn add_short_term(&self, entry: MemoryEntry) {
        let overflow = {
            let mut short = self.short_term.write().await;
            short.push(entry);
            if short.len() > SHORT_TERM_CAP {
                let mut drained = std::mem::take(&mut *short);
                drained.sort_by(|a, b| {
                    b.importance
                        .partial_cmp(&a.importance)
                        .unwrap_or(Ordering::Equal)
                });
                drained.truncate(CONSOLIDATE_KEEP);
                Some(drained)
            } else {
                None
            }
        };

        if let Some(important) = overflow {
            tracing::debug!(
                kept = important.len(),
                "consolidating short-term memory into long-term storage"
            );
            for entry in important {
                let key = entry.id.clone();
                self.add_long_term(&key, entry).await;
            }
        }
    }

    /// Insert into the long-term map and persist. Last write per key wins,
    /// in memory and on disk alike.
    pub async fn add_long_term(&self, key: &str, entry: MemoryEntry) {
        if let Err(e) = self.save_to_disk(key, &entry) {
            tracing::warn!("failed to persist memory entry '{}': {}", key, e);
        }
        self.long_term.write().await.insert(key.to_string(), entry);
    }

    /// Case-insensitive substring search over long-term content.
    pub async fn recall(&self, query: &str) -> Vec<MemoryEntry> {
        let needle = query.to_lowercase();
        self.long_term
            .read()
            .await
            .values()
            .filter(|entry| entry.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Record the outcome of one completed run as a short-term entry.
    /// Successful closes are remembered at importance 0.8, error closes
    /// at 0.2.
    pub async fn record_run(&self, thought: &AgentThought) {
        let content = thought
            .final_result
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_else(|| "run closed without a final result".to_string());
        let importance = if thought.status == AgentStatus::Error {
            0.2
        } else {
            0.8
        };
        let mut metadata = Map::new();
        metadata.insert("agent".to_string(), Value::String(thought.agent_name.clone()));
        metadata.insert(
            "status".to_string(),
            serde_json::to_value(&thought.status).unwrap_or(Value::Null),
        );
        self.add_short_term(MemoryEntry::new("run", content, metadata, importance))
            .await;
    }

    pub async fn clear(&self) {
        self.short_term.write().await.clear();
        self.long_term.write().await.clear();
    }

    #[cfg(test)]
    pub(crate) async fn short_term_len(&self) -> usize {
        self.short_term.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn long_term_len(&self) -> usize {
        self.long_term.read().await.len()
    }

    fn save_to_disk(&self, key: &str, entry: &MemoryEntry) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.storage_dir)?;
        let contents = serde_json::to_string_pretty(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(self.storage_dir.join(format!("{}.json", key)), contents)?;
        Ok(())
    }
}
