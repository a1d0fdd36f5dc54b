//! Analysis record registry.
//!
//! A process-wide keyed store of in-flight and completed analyses. The trait
//! is the narrow seam the orchestrator depends on; the in-memory
//! implementation is the default backing and is safe under concurrent
//! requests. Retention is bounded: records expire after a TTL and the store
//! holds at most `capacity` entries, evicting the oldest on overflow.

use async_trait::async_trait;
use bon::bon;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Pending,
    Completed,
    Failed,
}

/// The trackable unit representing one photo's analysis lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub status: AnalysisStatus,
    pub message: String,
    /// 0-100.
    pub progress: u8,
    pub result: Option<Value>,
}

/// One atomic state transition: status, message, progress and result always
/// change together.
#[derive(Debug, Clone)]
pub struct RecordUpdate {
    pub status: AnalysisStatus,
    pub message: String,
    pub progress: u8,
    pub result: Option<Value>,
}

impl RecordUpdate {
    pub fn completed(message: impl Into<String>, result: Option<Value>) -> Self {
        Self {
            status: AnalysisStatus::Completed,
            message: message.into(),
            progress: 100,
            result,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Failed,
            message: message.into(),
            progress: 0,
            result: None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("analysis record not found: {id}")]
pub struct RecordNotFound {
    pub id: String,
}

/// Result of a conditional update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    AlreadyCompleted,
    NotFound,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Registers a fresh PENDING record. Idempotent by id: a reused id
    /// overwrites the previous record.
    async fn create(&self, id: &str);

    async fn get(&self, id: &str) -> Option<AnalysisRecord>;

    /// Applies the update atomically, or reports the id as unknown.
    async fn update(&self, id: &str, update: RecordUpdate) -> Result<(), RecordNotFound>;

    /// Applies the update unless the record is already COMPLETED. The status
    /// check and the write happen under one lock, so a completion racing with
    /// this call can never be overwritten.
    async fn update_if_not_completed(&self, id: &str, update: RecordUpdate) -> UpdateOutcome;
}

struct Entry {
    record: AnalysisRecord,
    created_at: Instant,
}

pub struct InMemoryRecordStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

#[bon]
impl InMemoryRecordStore {
    /// # Builder Arguments
    ///
    /// * `ttl: Duration` - (Default: 1 hour) Age after which a record is eligible for eviction.
    /// * `capacity: usize` - (Default: 10000) Maximum number of retained records; the oldest is evicted on overflow.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_TTL)] ttl: Duration,
        #[builder(default = DEFAULT_CAPACITY)] capacity: usize,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Drops expired entries, then makes room for one more if at capacity.
    /// Called with the write lock held, so create stays atomic.
    fn evict(entries: &mut HashMap<String, Entry>, ttl: Duration, capacity: usize) {
        entries.retain(|id, entry| {
            let keep = entry.created_at.elapsed() < ttl;
            if !keep {
                debug!(id, "evicting expired analysis record");
            }
            keep
        });
        while entries.len() >= capacity {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            debug!(id = %oldest, "evicting oldest analysis record at capacity");
            entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
impl InMemoryRecordStore {
    pub(crate) async fn ids(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, id: &str) {
        let mut entries = self.entries.write().await;
        Self::evict(&mut entries, self.ttl, self.capacity);
        entries.insert(
            id.to_string(),
            Entry {
                record: AnalysisRecord {
                    id: id.to_string(),
                    status: AnalysisStatus::Pending,
                    message: "photo analysis pending".to_string(),
                    progress: 0,
                    result: None,
                },
                created_at: Instant::now(),
            },
        );
    }

    async fn get(&self, id: &str) -> Option<AnalysisRecord> {
        self.entries
            .read()
            .await
            .get(id)
            .map(|entry| entry.record.clone())
    }

    async fn update(&self, id: &str, update: RecordUpdate) -> Result<(), RecordNotFound> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or_else(|| RecordNotFound {
            id: id.to_string(),
        })?;
        entry.record.status = update.status;
        entry.record.message = update.message;
        entry.record.progress = update.progress.min(100);
        entry.record.result = update.result;
        Ok(())
    }

    async fn update_if_not_completed(&self, id: &str, update: RecordUpdate) -> UpdateOutcome {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(id) else {
            return UpdateOutcome::NotFound;
        };
        if entry.record.status == AnalysisStatus::Completed {
            return UpdateOutcome::AlreadyCompleted;
        }
        entry.record.status = update.status;
        entry.record.message = update.message;
        entry.record.progress = update.progress.min(100);
        entry.record.result = update.result;
        UpdateOutcome::Applied
    }
}
