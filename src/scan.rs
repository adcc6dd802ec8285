//! The per-domain scan pipeline: fetch, normalize, persist, diff, notify.

use crate::diff::LineDiff;
use crate::error::WatchError;
use crate::fetcher::ZoneFetcher;
use crate::history::{HistoryError, HistoryStore, ZoneSnapshot};
use crate::model::{CanonicalText, MonitoredDomain, RawRecordSet};
use crate::notify::Notifier;
use crate::zone;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a scan ended
#[derive(Debug)]
pub enum ScanOutcome {
    /// Fetch or parse failed; reported and nothing was written
    Skipped(WatchError),
    /// Stored, but there was no earlier snapshot to compare with
    FirstScan(ZoneSnapshot),
    /// Stored, identical to the previous snapshot
    Unchanged(ZoneSnapshot),
    /// Stored with a diff; the notifier was invoked
    Changed(ZoneSnapshot),
}

impl ScanOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ScanOutcome::Changed(_))
    }

    pub fn snapshot(&self) -> Option<&ZoneSnapshot> {
        match self {
            ScanOutcome::Skipped(_) => None,
            ScanOutcome::FirstScan(s) | ScanOutcome::Unchanged(s) | ScanOutcome::Changed(s) => {
                Some(s)
            }
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::Skipped(e) => write!(f, "skipped ({})", e),
            ScanOutcome::FirstScan(s) => write!(f, "first scan (snapshot {})", s.id),
            ScanOutcome::Unchanged(s) => write!(f, "unchanged (snapshot {})", s.id),
            ScanOutcome::Changed(s) => write!(f, "changed (snapshot {})", s.id),
        }
    }
}

/// Runs scans against one history store and notifier.
///
/// Each diff compares the new snapshot with the one immediately before it,
/// never with an older baseline. Callers must not run two scans of the same
/// domain at once: the store is only required to be consistent per domain,
/// and no locking happens here.
#[derive(Clone)]
pub struct Scanner {
    fetcher: ZoneFetcher,
    history: Arc<dyn HistoryStore>,
    notifier: Arc<dyn Notifier>,
}

impl Scanner {
    pub fn new(
        fetcher: ZoneFetcher,
        history: Arc<dyn HistoryStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            fetcher,
            history,
            notifier,
        }
    }

    /// Scan one domain.
    ///
    /// Fetch and parse failures are logged and come back as
    /// [`ScanOutcome::Skipped`] with nothing persisted. Only persistence
    /// failures are returned as errors.
    pub async fn run_scan(&self, domain: &MonitoredDomain) -> Result<ScanOutcome, WatchError> {
        debug!("Starting scan of {}", domain);

        let canonical = match self.fetch_and_normalize(domain).await {
            Ok(canonical) => canonical,
            Err(e) if e.is_operational() => {
                error!(domain = %domain, error = %e, "Scan failed");
                return Ok(ScanOutcome::Skipped(e));
            }
            Err(e) => return Err(e),
        };

        self.persist_and_diff(domain, canonical).await
    }

    async fn fetch_and_normalize(
        &self,
        domain: &MonitoredDomain,
    ) -> Result<CanonicalText, WatchError> {
        let raw: RawRecordSet = self.fetcher.fetch(domain).await?;
        zone::normalize(domain, &raw).map_err(|source| WatchError::ZoneParse {
            domain: domain.apex.clone(),
            source,
        })
    }

    /// Store `canonical` as the newest snapshot, diff it against the previous
    /// one and notify when they differ.
    pub async fn persist_and_diff(
        &self,
        domain: &MonitoredDomain,
        canonical: CanonicalText,
    ) -> Result<ScanOutcome, WatchError> {
        let id = self
            .history
            .append(&domain.apex, canonical.as_str(), Utc::now())
            .await?;

        let recent = self.history.most_recent(&domain.apex, 2).await?;
        let (current, previous) = match recent.as_slice() {
            [current, previous, ..] => (current.clone(), previous),
            [current] => {
                info!("First snapshot {} stored for {}", id, domain);
                return Ok(ScanOutcome::FirstScan(current.clone()));
            }
            // The store lost the snapshot it just accepted
            [] => return Err(HistoryError::NotFound(id).into()),
        };

        if current.id != id {
            warn!(
                "Newest snapshot for {} is {}, expected {}; was another scan running?",
                domain, current.id, id
            );
        }

        let diff = LineDiff::compute(&previous.canonical_text, &current.canonical_text);
        if diff.is_empty() {
            self.history.update_diff(current.id, None).await?;
            debug!("No changes for {} since snapshot {}", domain, previous.id);
            return Ok(ScanOutcome::Unchanged(current));
        }

        let text = diff.to_unified();
        self.history.update_diff(current.id, Some(&text)).await?;
        let current = ZoneSnapshot {
            diff: Some(text),
            ..current
        };

        info!(
            "Detected changes for {} (+{} -{}), snapshot {}",
            domain,
            diff.added(),
            diff.removed(),
            current.id
        );

        if let Err(e) = self.notifier.notify(domain, &current).await {
            warn!("Notification for {} failed: {}", domain, e);
        }

        Ok(ScanOutcome::Changed(current))
    }
}
