//! Change notification sinks.

use crate::history::ZoneSnapshot;
use crate::model::MonitoredDomain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(String),
    #[error("Webhook returned HTTP {0}")]
    Status(u16),
}

/// Receives snapshots whose diff is non-empty.
///
/// Best effort: the scanner logs a returned error and carries on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        domain: &MonitoredDomain,
        snapshot: &ZoneSnapshot,
    ) -> Result<(), NotifyError>;
}

/// Writes the change to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        domain: &MonitoredDomain,
        snapshot: &ZoneSnapshot,
    ) -> Result<(), NotifyError> {
        info!(
            domain = %domain,
            owner = %domain.owner,
            snapshot = %snapshot.id,
            "DNS records changed:\n{}",
            snapshot.diff.as_deref().unwrap_or_default()
        );
        Ok(())
    }
}

/// JSON body POSTed to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub domain: String,
    pub owner: String,
    pub snapshot_id: u64,
    pub created_at: DateTime<Utc>,
    pub diff: Option<String>,
}

impl WebhookPayload {
    pub fn new(domain: &MonitoredDomain, snapshot: &ZoneSnapshot) -> Self {
        Self {
            domain: domain.apex.clone(),
            owner: domain.owner.clone(),
            snapshot_id: snapshot.id.0,
            created_at: snapshot.created_at,
            diff: snapshot.diff.clone(),
        }
    }
}

/// POSTs changes to an HTTP endpoint from a background task
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("zonewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            url: url.into(),
            client,
            pending: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Wait for deliveries still in flight
    pub async fn flush(&self) {
        let mut pending = self.pending.lock().await;
        while pending.join_next().await.is_some() {}
    }

    /// Send one payload and wait for the response
    pub async fn deliver(&self, payload: &WebhookPayload) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        debug!("Webhook accepted change for {}", payload.domain);
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        domain: &MonitoredDomain,
        snapshot: &ZoneSnapshot,
    ) -> Result<(), NotifyError> {
        let payload = WebhookPayload::new(domain, snapshot);
        let notifier = self.clone();

        let mut pending = self.pending.lock().await;
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if let Err(e) = notifier.deliver(&payload).await {
                warn!("Webhook notification for {} failed: {}", payload.domain, e);
            }
        });

        Ok(())
    }
}

/// Forwards every notification to each inner sink
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn Notifier>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    /// Every sink is tried; the last failure is returned
    async fn notify(
        &self,
        domain: &MonitoredDomain,
        snapshot: &ZoneSnapshot,
    ) -> Result<(), NotifyError> {
        let mut last_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(domain, snapshot).await {
                warn!("Notifier failed for {}: {}", domain, e);
                last_error = Some(e);
            }
        }
        last_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SnapshotId;

    fn snapshot() -> ZoneSnapshot {
        ZoneSnapshot {
            id: SnapshotId(7),
            domain: "example.com".to_string(),
            canonical_text: "A 1.1.1.2\n".to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            diff: Some("--- Original\n+++ New\n".to_string()),
        }
    }

    #[derive(Default)]
    struct Counting {
        calls: std::sync::Mutex<usize>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Counting {
        async fn notify(&self, _: &MonitoredDomain, _: &ZoneSnapshot) -> Result<(), NotifyError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                Err(NotifyError::Status(500))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_webhook_payload_json() {
        let domain = MonitoredDomain::new("example.com", "acct-9");
        let payload = WebhookPayload::new(&domain, &snapshot());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["domain"], "example.com");
        assert_eq!(json["owner"], "acct-9");
        assert_eq!(json["snapshot_id"], 7);
        assert_eq!(json["created_at"], "2024-05-01T12:00:00Z");
        assert_eq!(json["diff"], "--- Original\n+++ New\n");
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let ok = Arc::new(Counting::default());
        let failing = Arc::new(Counting {
            fail: true,
            ..Default::default()
        });
        let sinks: Vec<Arc<dyn Notifier>> = vec![failing.clone(), ok.clone()];
        let fanout = FanoutNotifier::new(sinks);
        let domain = MonitoredDomain::new("example.com", "acct");

        let result = fanout.notify(&domain, &snapshot()).await;
        assert!(matches!(result, Err(NotifyError::Status(500))));
        assert_eq!(*ok.calls.lock().unwrap(), 1);
        assert_eq!(*failing.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let domain = MonitoredDomain::new("example.com", "acct");
        assert!(LogNotifier.notify(&domain, &snapshot()).await.is_ok());
    }
}
