//! Append-only, per-domain snapshot history.

pub mod memory;
pub mod redis_backend;

pub use memory::MemoryHistory;
pub use redis_backend::{RedisHistory, RedisKeys};

use crate::config::HistoryBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted scan of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub id: SnapshotId,
    pub domain: String,
    /// Normalized zone text; never changes once written
    pub canonical_text: String,
    pub created_at: DateTime<Utc>,
    /// Unified diff against the previous snapshot, None when nothing changed
    pub diff: Option<String>,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History backend error: {0}")]
    Backend(String),

    #[error("Snapshot {0} not found")]
    NotFound(SnapshotId),

    #[error("Snapshot {0} already has a diff")]
    DiffAlreadySet(SnapshotId),

    #[error("Snapshot serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Serialization(err.to_string())
    }
}

/// Ordered log of snapshots per domain.
///
/// Implementations must be read-after-write consistent for a single domain:
/// `most_recent` called after `append` returns the appended snapshot first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a snapshot with no diff
    async fn append(
        &self,
        domain: &str,
        canonical_text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<SnapshotId, HistoryError>;

    /// Up to `n` snapshots, newest first
    async fn most_recent(&self, domain: &str, n: usize) -> Result<Vec<ZoneSnapshot>, HistoryError>;

    /// Record the diff of a snapshot. The write happens once per snapshot,
    /// even when the diff written is None.
    async fn update_diff(&self, id: SnapshotId, diff: Option<&str>) -> Result<(), HistoryError>;

    /// Number of snapshots stored for `domain`
    async fn count(&self, domain: &str) -> Result<usize, HistoryError>;

    /// Newest snapshot, if any
    async fn latest(&self, domain: &str) -> Result<Option<ZoneSnapshot>, HistoryError> {
        Ok(self.most_recent(domain, 1).await?.into_iter().next())
    }
}

/// Open the configured history backend
pub async fn open(backend: &HistoryBackend) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    match backend {
        HistoryBackend::Memory => Ok(Arc::new(MemoryHistory::new())),
        HistoryBackend::Redis { url, key_prefix } => {
            Ok(Arc::new(RedisHistory::new(url, key_prefix.clone()).await?))
        }
    }
}
