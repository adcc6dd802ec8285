//! Nameserver discovery and authoritative fetch with sequential failover.

use crate::error::{DnsError, WatchError};
use crate::model::{MonitoredDomain, RawRecordSet};
use crate::resolver::DnsResolver;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The two DNS questions a scan needs answered
#[async_trait]
pub trait DnsQuerier: Send + Sync {
    /// NS answer for `domain` from a recursive resolver, one presentation line per record
    async fn query_ns(&self, domain: &str) -> Result<String, DnsError>;

    /// Every configured record type for `domain`, asked directly of `nameserver`
    async fn query_all(&self, domain: &str, nameserver: &str) -> Result<RawRecordSet, DnsError>;
}

#[async_trait]
impl DnsQuerier for DnsResolver {
    async fn query_ns(&self, domain: &str) -> Result<String, DnsError> {
        self.lookup_ns_text(domain).await
    }

    async fn query_all(&self, domain: &str, nameserver: &str) -> Result<RawRecordSet, DnsError> {
        self.fetch_records(domain, nameserver).await
    }
}

/// Pull nameserver hostnames out of NS answer text.
///
/// A line contributes when its second-to-last token is `NS`; the last token is
/// the target with any trailing dot removed. Order is preserved.
pub fn extract_nameservers(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace().rev();
            let target = tokens.next()?;
            let rtype = tokens.next()?;
            if rtype != "NS" {
                return None;
            }
            let host = target.trim_end_matches('.');
            (!host.is_empty()).then(|| host.to_string())
        })
        .collect()
}

/// Fetches a domain's records from the first nameserver that answers
#[derive(Clone)]
pub struct ZoneFetcher {
    querier: Arc<dyn DnsQuerier>,
}

impl ZoneFetcher {
    pub fn new(querier: Arc<dyn DnsQuerier>) -> Self {
        Self { querier }
    }

    /// Discover the domain's nameservers, then try each in discovery order.
    ///
    /// Stops at the first success. Later candidates are never contacted once
    /// one has answered, and the last failure is reported when all fail.
    pub async fn fetch(&self, domain: &MonitoredDomain) -> Result<RawRecordSet, WatchError> {
        let ns_text = self.querier.query_ns(&domain.apex).await.map_err(|source| {
            WatchError::NameserverLookup {
                domain: domain.apex.clone(),
                source,
            }
        })?;

        let nameservers = extract_nameservers(&ns_text);
        if nameservers.is_empty() {
            return Err(WatchError::NoNameserversFound {
                domain: domain.apex.clone(),
            });
        }

        debug!("Nameservers for {}: {:?}", domain, nameservers);

        let mut last_error = None;
        for nameserver in &nameservers {
            match self.querier.query_all(&domain.apex, nameserver).await {
                Ok(records) => {
                    info!(
                        "Fetched {} records for {} from {}",
                        records.lines.len(),
                        domain,
                        nameserver
                    );
                    return Ok(records);
                }
                Err(e) => {
                    warn!("Nameserver {} failed for {}: {}", nameserver, domain, e);
                    last_error = Some(e);
                }
            }
        }

        Err(WatchError::AllNameserversUnreachable {
            domain: domain.apex.clone(),
            source: last_error.unwrap_or_else(|| DnsError::NoAddress(domain.apex.clone())),
        })
    }
}
