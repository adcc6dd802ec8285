use std::time::Duration;

use thiserror::Error;

use crate::dns::ParseError;
use crate::history::HistoryError;
use crate::zone::ZoneError;

/// Wire-level query failures
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Query to {server} timed out after {timeout:?}")]
    Timeout { server: String, timeout: Duration },

    #[error("Server {server} answered with rcode {rcode}")]
    ServerFailure { server: String, rcode: u8 },

    #[error("Response id {got} does not match query id {expected}")]
    IdMismatch { expected: u16, got: u16 },

    #[error("No address found for nameserver {0}")]
    NoAddress(String),

    #[error("No resolvers configured")]
    NoResolvers,
}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError::Io(err.to_string())
    }
}

impl From<ParseError> for DnsError {
    fn from(err: ParseError) -> Self {
        DnsError::Parse(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid resolver address: {0}")]
    InvalidResolver(String),
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("Invalid record type: {0}")]
    InvalidRecordType(String),
    #[error("Invalid history backend: {0}")]
    InvalidBackend(String),
    #[error("Configuration parse error: {0}")]
    ParseError(String),
    #[error("Failed to read configuration file: {0}")]
    Io(String),
}

/// Everything a scan can fail with.
///
/// The first four variants are expected operational failures: they are
/// reported through the log and the scan is skipped. The rest propagate.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Name servers not found for {domain}")]
    NoNameserversFound { domain: String },

    #[error("Name server lookup failed for {domain}: {source}")]
    NameserverLookup {
        domain: String,
        #[source]
        source: DnsError,
    },

    #[error("All name servers for {domain} are unreachable: {source}")]
    AllNameserversUnreachable {
        domain: String,
        #[source]
        source: DnsError,
    },

    #[error("Zone for {domain} could not be parsed: {source}")]
    ZoneParse {
        domain: String,
        #[source]
        source: ZoneError,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] HistoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl WatchError {
    /// True for failures that skip a scan without surfacing to the caller
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(
            self,
            Self::NoNameserversFound { .. }
                | Self::NameserverLookup { .. }
                | Self::AllNameserversUnreachable { .. }
                | Self::ZoneParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
