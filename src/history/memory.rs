use super::{HistoryError, HistoryStore, SnapshotId, ZoneSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// In-process history, lost on exit
#[derive(Debug, Default)]
pub struct MemoryHistory {
    /// Snapshots per domain, oldest first
    domains: DashMap<String, Vec<ZoneSnapshot>>,
    /// Owning domain of each snapshot id
    index: DashMap<SnapshotId, String>,
    /// Snapshots whose diff slot is used up, including by a None diff
    diff_written: DashSet<SnapshotId>,
    next_id: AtomicU64,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(
        &self,
        domain: &str,
        canonical_text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<SnapshotId, HistoryError> {
        let id = SnapshotId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let snapshot = ZoneSnapshot {
            id,
            domain: domain.to_string(),
            canonical_text: canonical_text.to_string(),
            created_at,
            diff: None,
        };

        self.index.insert(id, domain.to_string());
        self.domains
            .entry(domain.to_string())
            .or_default()
            .push(snapshot);

        trace!("Appended snapshot {} for {}", id, domain);
        Ok(id)
    }

    async fn most_recent(&self, domain: &str, n: usize) -> Result<Vec<ZoneSnapshot>, HistoryError> {
        Ok(self
            .domains
            .get(domain)
            .map(|snapshots| snapshots.iter().rev().take(n).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_diff(&self, id: SnapshotId, diff: Option<&str>) -> Result<(), HistoryError> {
        let domain = self
            .index
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(HistoryError::NotFound(id))?;

        let mut snapshots = self
            .domains
            .get_mut(&domain)
            .ok_or(HistoryError::NotFound(id))?;
        let snapshot = snapshots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(HistoryError::NotFound(id))?;

        if !self.diff_written.insert(id) {
            return Err(HistoryError::DiffAlreadySet(id));
        }
        snapshot.diff = diff.map(str::to_string);
        Ok(())
    }

    async fn count(&self, domain: &str) -> Result<usize, HistoryError> {
        Ok(self.domains.get(domain).map(|s| s.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_most_recent_is_newest_first() {
        let history = MemoryHistory::new();
        let first = history.append("example.com", "one\n", Utc::now()).await.unwrap();
        let second = history.append("example.com", "two\n", Utc::now()).await.unwrap();
        history.append("other.com", "x\n", Utc::now()).await.unwrap();

        let recent = history.most_recent("example.com", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second);
        assert_eq!(recent[1].id, first);
        assert_eq!(recent[0].canonical_text, "two\n");
        assert!(recent[0].diff.is_none());

        assert_eq!(history.count("example.com").await.unwrap(), 2);
        assert_eq!(history.count("missing.com").await.unwrap(), 0);
        assert!(history.most_recent("missing.com", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_diff_is_written_once() {
        let history = MemoryHistory::new();
        let id = history.append("example.com", "a\n", Utc::now()).await.unwrap();

        history.update_diff(id, Some("--- Original\n")).await.unwrap();
        assert!(matches!(
            history.update_diff(id, Some("again")).await,
            Err(HistoryError::DiffAlreadySet(_))
        ));

        let latest = history.latest("example.com").await.unwrap().unwrap();
        assert_eq!(latest.diff.as_deref(), Some("--- Original\n"));
    }

    #[tokio::test]
    async fn test_null_diff_also_uses_up_the_write() {
        let history = MemoryHistory::new();
        let id = history.append("example.com", "a\n", Utc::now()).await.unwrap();

        history.update_diff(id, None).await.unwrap();
        assert!(matches!(
            history.update_diff(id, Some("late")).await,
            Err(HistoryError::DiffAlreadySet(_))
        ));
        assert!(matches!(
            history.update_diff(id, None).await,
            Err(HistoryError::DiffAlreadySet(_))
        ));

        let latest = history.latest("example.com").await.unwrap().unwrap();
        assert!(latest.diff.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_snapshot() {
        let history = MemoryHistory::new();
        assert!(matches!(
            history.update_diff(SnapshotId(42), None).await,
            Err(HistoryError::NotFound(SnapshotId(42)))
        ));
    }
}
