mod common;

use common::{Handler, MockDnsServer, RecordingNotifier, answer, domain, reply_with_rcode};
use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use zonewatch::dns::common::name_to_labels;
use zonewatch::dns::enums::DNSResourceType;
use zonewatch::dns::rdata::DNSResourceData;
use zonewatch::dns::resource::DNSResource;
use zonewatch::dns::{DNSPacket, rcode};
use zonewatch::error::DnsError;
use zonewatch::fetcher::ZoneFetcher;
use zonewatch::history::{HistoryStore, MemoryHistory};
use zonewatch::resolver::DnsResolver;
use zonewatch::{ScanOutcome, Scanner, WatchError};

fn qtype(query: &DNSPacket) -> DNSResourceType {
    query.questions[0].qtype
}

fn soa() -> DNSResource {
    DNSResource::new(
        "example.com.",
        3600,
        DNSResourceData::SOA {
            mname: name_to_labels("ns1.example.net."),
            rname: name_to_labels("hostmaster.example.com."),
            serial: 2024010101,
            refresh: 7200,
            retry: 3600,
            expire: 1209600,
            minimum: 300,
        },
    )
}

fn ns(target: &str) -> DNSResource {
    DNSResource::new("example.com.", 86400, DNSResourceData::NS(name_to_labels(target)))
}

fn a(ip: Ipv4Addr) -> DNSResource {
    DNSResource::new("example.com.", 300, DNSResourceData::A(ip))
}

/// Zone served for example.com; NS points back at the mock itself
fn zone_handler(address: Arc<Mutex<Ipv4Addr>>, ns_target: &'static str) -> Handler {
    Arc::new(move |query: &DNSPacket| {
        let answers = match qtype(query) {
            DNSResourceType::SOA => vec![soa()],
            DNSResourceType::NS => vec![ns(ns_target)],
            DNSResourceType::A => vec![a(*address.lock().unwrap())],
            _ => Vec::new(),
        };
        Some(answer(query, answers))
    })
}

#[tokio::test]
async fn test_lookup_ns_text() {
    let address = Arc::new(Mutex::new(Ipv4Addr::new(192, 0, 2, 1)));
    let server = MockDnsServer::start(zone_handler(address, "ns1.example.net."), false).await;
    let resolver = DnsResolver::new(&server.config());

    let text = resolver.lookup_ns_text("example.com").await.unwrap();
    assert_eq!(text, "example.com. 86400 IN NS ns1.example.net.");
}

#[tokio::test]
async fn test_fetch_records_from_ip_nameserver() {
    let address = Arc::new(Mutex::new(Ipv4Addr::new(192, 0, 2, 1)));
    let server = MockDnsServer::start(zone_handler(address, "ns1.example.net."), false).await;
    let resolver = DnsResolver::new(&server.config());

    let records = resolver.fetch_records("example.com", "127.0.0.1").await.unwrap();

    assert_eq!(records.nameserver, "127.0.0.1");
    assert!(records.lines.contains(&"example.com. 300 IN A 192.0.2.1".to_string()));
    assert!(
        records
            .lines
            .contains(&"example.com. 86400 IN NS ns1.example.net.".to_string())
    );
    assert!(records.lines.iter().any(|l| l.contains(" IN SOA ")));
    assert_eq!(records.lines.len(), 3);
    assert_eq!(server.tcp_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_truncated_answer_retried_over_tcp() {
    let address = Arc::new(Mutex::new(Ipv4Addr::new(192, 0, 2, 1)));
    let server = MockDnsServer::start(zone_handler(address, "ns1.example.net."), true).await;
    let resolver = DnsResolver::new(&server.config());

    let records = resolver.fetch_records("example.com", "127.0.0.1").await.unwrap();

    assert!(records.lines.contains(&"example.com. 300 IN A 192.0.2.1".to_string()));
    let udp = server.udp_queries.load(Ordering::SeqCst);
    assert!(udp > 0);
    assert_eq!(server.tcp_queries.load(Ordering::SeqCst), udp);
}

#[tokio::test]
async fn test_servfail_fails_the_nameserver() {
    let handler: Handler = Arc::new(|query: &DNSPacket| Some(reply_with_rcode(query, rcode::SERVFAIL)));
    let server = MockDnsServer::start(handler, false).await;
    let resolver = DnsResolver::new(&server.config());

    let err = resolver
        .fetch_records("example.com", "127.0.0.1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DnsError::ServerFailure {
            rcode: rcode::SERVFAIL,
            ..
        }
    ));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let handler: Handler = Arc::new(|_: &DNSPacket| None);
    let server = MockDnsServer::start(handler, false).await;
    let resolver = DnsResolver::new(&server.config());

    let err = resolver.lookup_ns_text("example.com").await.unwrap_err();
    assert!(matches!(err, DnsError::Timeout { .. }));
}

#[tokio::test]
async fn test_nxdomain_is_an_empty_answer() {
    let handler: Handler = Arc::new(|query: &DNSPacket| Some(reply_with_rcode(query, rcode::NXDOMAIN)));
    let server = MockDnsServer::start(handler, false).await;
    let resolver = DnsResolver::new(&server.config());

    let text = resolver.lookup_ns_text("missing.example").await.unwrap();
    assert!(text.is_empty());

    let history = Arc::new(MemoryHistory::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = Scanner::new(
        ZoneFetcher::new(Arc::new(resolver)),
        history.clone(),
        notifier.clone(),
    );
    let outcome = scanner.run_scan(&domain()).await.unwrap();
    assert!(matches!(
        outcome,
        ScanOutcome::Skipped(WatchError::NoNameserversFound { .. })
    ));
    assert_eq!(history.count("example.com").await.unwrap(), 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_end_to_end_change_detection() {
    let address = Arc::new(Mutex::new(Ipv4Addr::new(1, 1, 1, 1)));
    let server = MockDnsServer::start(zone_handler(address.clone(), "127.0.0.1."), false).await;

    let history = Arc::new(MemoryHistory::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = Scanner::new(
        ZoneFetcher::new(Arc::new(DnsResolver::new(&server.config()))),
        history.clone(),
        notifier.clone(),
    );

    let first = scanner.run_scan(&domain()).await.unwrap();
    assert!(matches!(first, ScanOutcome::FirstScan(_)));

    let second = scanner.run_scan(&domain()).await.unwrap();
    assert!(matches!(second, ScanOutcome::Unchanged(_)));

    *address.lock().unwrap() = Ipv4Addr::new(1, 1, 1, 2);
    let third = scanner.run_scan(&domain()).await.unwrap();
    assert!(third.changed());

    let diff = third.snapshot().unwrap().diff.clone().unwrap();
    assert!(diff.lines().any(|l| l.starts_with('-') && l.ends_with("1.1.1.1")));
    assert!(diff.lines().any(|l| l.starts_with('+') && l.ends_with("1.1.1.2")));
    assert_eq!(notifier.count(), 1);
    assert_eq!(history.count("example.com").await.unwrap(), 3);
}
