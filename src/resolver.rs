use crate::config::WatchConfig;
use crate::dns::enums::DNSResourceType;
use crate::dns::rdata::DNSResourceData;
use crate::dns::{DNSPacket, rcode};
use crate::error::DnsError;
use crate::model::RawRecordSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

type Result<T> = std::result::Result<T, DnsError>;

/// Wire-level DNS client.
///
/// Recursive questions go to the configured resolvers in order; authoritative
/// questions go straight to one nameserver address with RD cleared.
#[derive(Debug, Clone)]
pub struct DnsResolver {
    resolvers: Vec<SocketAddr>,
    nameserver_port: u16,
    query_timeout: Duration,
    max_retries: u8,
    record_types: Vec<DNSResourceType>,
}

impl DnsResolver {
    pub fn new(config: &WatchConfig) -> Self {
        info!(
            "DNS resolver initialized with {} recursive resolvers",
            config.resolvers.len()
        );
        debug!("Recursive resolvers: {:?}", config.resolvers);

        Self {
            resolvers: config.resolvers.clone(),
            nameserver_port: config.nameserver_port,
            query_timeout: config.query_timeout,
            max_retries: config.max_retries,
            record_types: config.record_types.clone(),
        }
    }

    /// Query the recursive resolvers for `name`'s NS set, rendered one record per line
    pub async fn lookup_ns_text(&self, name: &str) -> Result<String> {
        let response = self.resolve_recursively(name, DNSResourceType::NS).await?;
        let lines: Vec<String> = response
            .answers_of(DNSResourceType::NS)
            .map(|answer| answer.to_presentation())
            .collect();
        Ok(lines.join("\n"))
    }

    /// Resolve a nameserver hostname to addresses (IPv4 first). IP literals pass through.
    pub async fn lookup_addresses(&self, host: &str) -> Result<Vec<IpAddr>> {
        if let Ok(ip) = host.trim_end_matches('.').parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let mut addresses = Vec::new();
        let mut last_error = None;

        for rtype in [DNSResourceType::A, DNSResourceType::AAAA] {
            match self.resolve_recursively(host, rtype).await {
                Ok(response) => {
                    addresses.extend(response.answers.iter().filter_map(|a| match &a.rdata {
                        DNSResourceData::A(ip) => Some(IpAddr::V4(*ip)),
                        DNSResourceData::AAAA(ip) => Some(IpAddr::V6(*ip)),
                        _ => None,
                    }));
                }
                Err(e) => {
                    debug!("{:?} lookup for {} failed: {}", rtype, host, e);
                    last_error = Some(e);
                }
            }
        }

        if addresses.is_empty() {
            return Err(last_error.unwrap_or_else(|| DnsError::NoAddress(host.to_string())));
        }

        Ok(addresses)
    }

    /// Fetch every configured record type for `domain` directly from `nameserver`.
    ///
    /// Every request must succeed; a single failure fails the nameserver so the
    /// result always comes from one consistent source.
    pub async fn fetch_records(&self, domain: &str, nameserver: &str) -> Result<RawRecordSet> {
        let addresses = self.lookup_addresses(nameserver).await?;
        let mut last_error = None;

        for ip in addresses {
            let server = SocketAddr::new(ip, self.nameserver_port);
            match self.fetch_from_address(domain, server).await {
                Ok(lines) => {
                    debug!(
                        "Fetched {} records for {} from {} ({})",
                        lines.len(),
                        domain,
                        nameserver,
                        server
                    );
                    return Ok(RawRecordSet::new(nameserver, lines));
                }
                Err(e) => {
                    warn!("Failed to fetch {} from {} ({}): {}", domain, nameserver, server, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DnsError::NoAddress(nameserver.to_string())))
    }

    async fn fetch_from_address(&self, domain: &str, server: SocketAddr) -> Result<Vec<String>> {
        let mut lines = Vec::new();

        for &rtype in &self.record_types {
            let response = self.query(server, domain, rtype, false).await?;
            if !response.header.aa {
                debug!(
                    "Non-authoritative {:?} answer for {} from {}",
                    rtype, domain, server
                );
            }
            lines.extend(response.answers.iter().map(|a| a.to_presentation()));
        }

        Ok(lines)
    }

    /// Ask each recursive resolver in turn until one answers
    async fn resolve_recursively(&self, name: &str, qtype: DNSResourceType) -> Result<DNSPacket> {
        let mut last_error = None;

        for (attempt, &resolver_addr) in self.resolvers.iter().enumerate() {
            match self.query(resolver_addr, name, qtype, true).await {
                Ok(response) => {
                    debug!(
                        "Resolved {} {:?} via {} (attempt {})",
                        name,
                        qtype,
                        resolver_addr,
                        attempt + 1
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Failed to resolve {} from {}: {}", name, resolver_addr, e);
                    last_error = Some(e);
                }
            }
        }

        error!("All resolvers failed to resolve {} {:?}", name, qtype);
        Err(last_error.unwrap_or(DnsError::NoResolvers))
    }

    /// Send one question to one server, retrying up to `max_retries` times
    pub async fn query(
        &self,
        server: SocketAddr,
        name: &str,
        qtype: DNSResourceType,
        recursion_desired: bool,
    ) -> Result<DNSPacket> {
        let id: u16 = rand::random();
        let query = DNSPacket::query(id, name, qtype, recursion_desired);
        let query_bytes = query.serialize()?;

        trace!("Sending {} bytes to {}", query_bytes.len(), server);

        let mut retry = 0;
        loop {
            match self
                .send_query_with_timeout(&query_bytes, id, server)
                .await
            {
                Ok(response) => {
                    if retry > 0 {
                        debug!("Query succeeded on retry {}", retry);
                    }
                    return Ok(response);
                }
                Err(e) if retry < self.max_retries => {
                    retry += 1;
                    debug!("Query attempt {} to {} failed, retrying: {}", retry, server, e);
                    tokio::time::sleep(Duration::from_millis(100 * retry as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send query with timeout (UDP first, TCP if the answer was truncated)
    async fn send_query_with_timeout(
        &self,
        query_bytes: &[u8],
        id: u16,
        server: SocketAddr,
    ) -> Result<DNSPacket> {
        let query_future = async {
            let response = self.send_udp_query(query_bytes, server).await?;
            let response = if response.header.tc {
                debug!("UDP response from {} truncated, retrying with TCP", server);
                self.send_tcp_query(query_bytes, server).await?
            } else {
                response
            };
            check_response(response, id, server)
        };

        timeout(self.query_timeout, query_future)
            .await
            .map_err(|_| DnsError::Timeout {
                server: server.to_string(),
                timeout: self.query_timeout,
            })?
    }

    async fn send_udp_query(&self, query_bytes: &[u8], server: SocketAddr) -> Result<DNSPacket> {
        let bind_addr = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server).await?;
        socket.send(query_bytes).await?;

        let mut response_buf = vec![0u8; 4096];
        let response_len = socket.recv(&mut response_buf).await?;

        trace!(
            "Raw UDP response data ({} bytes): {:02x?}",
            response_len,
            &response_buf[..response_len.min(64)]
        );

        DNSPacket::parse(&response_buf[..response_len]).map_err(|e| {
            debug!("Failed to parse UDP response from {}: {}", server, e);
            DnsError::Parse(format!("Failed to parse response: {}", e))
        })
    }

    async fn send_tcp_query(&self, query_bytes: &[u8], server: SocketAddr) -> Result<DNSPacket> {
        let mut stream = TcpStream::connect(server).await?;

        // Length-prefixed framing
        stream
            .write_all(&(query_bytes.len() as u16).to_be_bytes())
            .await?;
        stream.write_all(query_bytes).await?;
        stream.flush().await?;

        let mut length_buf = [0u8; 2];
        stream.read_exact(&mut length_buf).await?;
        let response_length = u16::from_be_bytes(length_buf) as usize;

        let mut response_buf = vec![0; response_length];
        stream.read_exact(&mut response_buf).await?;

        trace!(
            "Raw TCP response data ({} bytes): {:02x?}",
            response_length,
            &response_buf[..response_length.min(64)]
        );

        DNSPacket::parse(&response_buf).map_err(|e| {
            debug!("Failed to parse TCP response from {}: {}", server, e);
            DnsError::Parse(format!("Failed to parse response: {}", e))
        })
    }
}

/// Reject responses that do not answer our question successfully.
/// NXDOMAIN and empty NOERROR answers are valid, empty results.
fn check_response(response: DNSPacket, id: u16, server: SocketAddr) -> Result<DNSPacket> {
    if response.header.id != id {
        return Err(DnsError::IdMismatch {
            expected: id,
            got: response.header.id,
        });
    }

    if !response.header.qr {
        return Err(DnsError::Parse(format!("{} sent a query, not a response", server)));
    }

    match response.header.rcode {
        rcode::NOERROR | rcode::NXDOMAIN => Ok(response),
        // FORMERR, SERVFAIL, NOTIMP, REFUSED and anything newer
        other => Err(DnsError::ServerFailure {
            server: server.to_string(),
            rcode: other,
        }),
    }
}
