//! Shared fixtures for zonewatch integration tests
//!
//! Scripted DNS answers, recording sinks, a history store that can be told to
//! fail, and a small UDP/TCP DNS server bound to localhost.

#![allow(dead_code)] // Each test binary uses a different subset

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;
use zonewatch::config::WatchConfig;
use zonewatch::dns::{DNSPacket, rcode, resource::DNSResource};
use zonewatch::error::DnsError;
use zonewatch::fetcher::DnsQuerier;
use zonewatch::history::{HistoryError, HistoryStore, MemoryHistory, SnapshotId, ZoneSnapshot};
use zonewatch::model::{MonitoredDomain, RawRecordSet};
use zonewatch::notify::{Notifier, NotifyError};

pub const DOMAIN: &str = "example.com";

pub fn domain() -> MonitoredDomain {
    MonitoredDomain::new(DOMAIN, "acct-1")
}

/// Presentation lines for a minimal zone whose apex A record is `ip`
pub fn zone_lines(ip: &str) -> Vec<String> {
    vec![
        "example.com. 3600 IN SOA ns1.example.net. hostmaster.example.com. 2024010101 7200 3600 1209600 300".to_string(),
        "example.com. 86400 IN NS ns1.example.net.".to_string(),
        format!("example.com. 300 IN A {}", ip),
    ]
}

/// DnsQuerier answering from a script instead of the network
pub struct ScriptedQuerier {
    /// NS answer text; None makes the NS lookup fail
    ns_text: Mutex<Option<String>>,
    /// Records per nameserver; a nameserver missing here fails
    zones: Mutex<HashMap<String, Vec<String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedQuerier {
    pub fn new(nameservers: &[&str]) -> Self {
        let ns_text = nameservers
            .iter()
            .map(|ns| format!("{}. 86400 IN NS {}.", DOMAIN, ns))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            ns_text: Mutex::new(Some(ns_text)),
            zones: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every NS lookup fails
    pub fn failing_ns_lookup() -> Self {
        let querier = Self::new(&[]);
        *querier.ns_text.lock().unwrap() = None;
        querier
    }

    pub fn set_records(&self, nameserver: &str, lines: Vec<String>) {
        self.zones
            .lock()
            .unwrap()
            .insert(nameserver.to_string(), lines);
    }

    pub fn fail(&self, nameserver: &str) {
        self.zones.lock().unwrap().remove(nameserver);
    }

    /// Nameservers asked for records, in order
    pub fn record_queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| call.strip_prefix("all:").map(str::to_string))
            .collect()
    }

    pub fn ns_queries(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with("ns:"))
            .count()
    }
}

#[async_trait]
impl DnsQuerier for ScriptedQuerier {
    async fn query_ns(&self, domain: &str) -> Result<String, DnsError> {
        self.calls.lock().unwrap().push(format!("ns:{}", domain));
        self.ns_text.lock().unwrap().clone().ok_or(DnsError::Timeout {
            server: "resolver".to_string(),
            timeout: Duration::from_secs(1),
        })
    }

    async fn query_all(&self, _domain: &str, nameserver: &str) -> Result<RawRecordSet, DnsError> {
        self.calls.lock().unwrap().push(format!("all:{}", nameserver));
        match self.zones.lock().unwrap().get(nameserver) {
            Some(lines) => Ok(RawRecordSet::new(nameserver, lines.clone())),
            None => Err(DnsError::ServerFailure {
                server: nameserver.to_string(),
                rcode: rcode::REFUSED,
            }),
        }
    }
}

/// Notifier that keeps everything it is handed
#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<ZoneSnapshot>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<ZoneSnapshot> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _: &MonitoredDomain, snapshot: &ZoneSnapshot) -> Result<(), NotifyError> {
        self.received.lock().unwrap().push(snapshot.clone());
        if self.fail {
            Err(NotifyError::Status(503))
        } else {
            Ok(())
        }
    }
}

/// MemoryHistory with switchable write failures
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryHistory,
    pub fail_append: AtomicBool,
    pub fail_update: AtomicBool,
}

#[async_trait]
impl HistoryStore for FailingStore {
    async fn append(
        &self,
        domain: &str,
        canonical_text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<SnapshotId, HistoryError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(HistoryError::Backend("append refused".to_string()));
        }
        self.inner.append(domain, canonical_text, created_at).await
    }

    async fn most_recent(&self, domain: &str, n: usize) -> Result<Vec<ZoneSnapshot>, HistoryError> {
        self.inner.most_recent(domain, n).await
    }

    async fn update_diff(&self, id: SnapshotId, diff: Option<&str>) -> Result<(), HistoryError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(HistoryError::Backend("update refused".to_string()));
        }
        self.inner.update_diff(id, diff).await
    }

    async fn count(&self, domain: &str) -> Result<usize, HistoryError> {
        self.inner.count(domain).await
    }
}

/// Builds the reply to a query; None drops it unanswered
pub type Handler = Arc<dyn Fn(&DNSPacket) -> Option<DNSPacket> + Send + Sync>;

/// DNS server on 127.0.0.1 answering over UDP and TCP on the same port
pub struct MockDnsServer {
    pub addr: SocketAddr,
    pub udp_queries: Arc<AtomicUsize>,
    pub tcp_queries: Arc<AtomicUsize>,
    tasks: Vec<JoinHandle<()>>,
}

impl MockDnsServer {
    /// Start a server. With `truncate_udp` every UDP reply is emptied and
    /// flagged TC so clients have to come back over TCP.
    pub async fn start(handler: Handler, truncate_udp: bool) -> Self {
        for _ in 0..20 {
            let udp = UdpSocket::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind UDP socket");
            let addr = udp.local_addr().expect("UDP socket has no address");
            let Ok(tcp) = TcpListener::bind(addr).await else {
                continue;
            };

            let udp_queries = Arc::new(AtomicUsize::new(0));
            let tcp_queries = Arc::new(AtomicUsize::new(0));

            let udp_task = tokio::spawn(serve_udp(
                udp,
                handler.clone(),
                udp_queries.clone(),
                truncate_udp,
            ));
            let tcp_task = tokio::spawn(serve_tcp(tcp, handler.clone(), tcp_queries.clone()));

            return Self {
                addr,
                udp_queries,
                tcp_queries,
                tasks: vec![udp_task, tcp_task],
            };
        }
        panic!("Could not bind UDP and TCP on the same port");
    }

    /// Config pointing both recursive and authoritative traffic at this server
    pub fn config(&self) -> WatchConfig {
        WatchConfig {
            resolvers: vec![self.addr],
            nameserver_port: self.addr.port(),
            query_timeout: Duration::from_millis(500),
            max_retries: 0,
            ..Default::default()
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn serve_udp(
    socket: UdpSocket,
    handler: Handler,
    queries: Arc<AtomicUsize>,
    truncate: bool,
) {
    let mut buf = vec![0u8; 4096];
    loop {
        let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
            break;
        };
        let Ok(query) = DNSPacket::parse(&buf[..len]) else {
            continue;
        };
        queries.fetch_add(1, Ordering::SeqCst);

        let Some(mut response) = handler(&query) else {
            continue;
        };
        if truncate {
            response.header.tc = true;
            response.answers.clear();
        }
        if let Ok(bytes) = response.serialize() {
            let _ = socket.send_to(&bytes, peer).await;
        }
    }
}

async fn serve_tcp(listener: TcpListener, handler: Handler, queries: Arc<AtomicUsize>) {
    while let Ok((mut stream, _)) = listener.accept().await {
        let handler = handler.clone();
        let queries = queries.clone();
        tokio::spawn(async move {
            let mut length = [0u8; 2];
            if stream.read_exact(&mut length).await.is_err() {
                return;
            }
            let mut body = vec![0u8; u16::from_be_bytes(length) as usize];
            if stream.read_exact(&mut body).await.is_err() {
                return;
            }
            let Ok(query) = DNSPacket::parse(&body) else {
                return;
            };
            queries.fetch_add(1, Ordering::SeqCst);

            let Some(response) = handler(&query) else {
                return;
            };
            if let Ok(bytes) = response.serialize() {
                let _ = stream.write_all(&(bytes.len() as u16).to_be_bytes()).await;
                let _ = stream.write_all(&bytes).await;
            }
        });
    }
}

/// Authoritative answer to `query` carrying `answers`
pub fn answer(query: &DNSPacket, answers: Vec<DNSResource>) -> DNSPacket {
    let mut response = query.to_response();
    response.header.aa = true;
    response.answers = answers;
    response
}

/// Reply to `query` with the given rcode and nothing else
pub fn reply_with_rcode(query: &DNSPacket, code: u8) -> DNSPacket {
    let mut response = query.to_response();
    response.header.rcode = code;
    response
}
