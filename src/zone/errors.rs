use std::fmt;

/// Zone-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// Presentation text could not be parsed
    ParseError(String),
    /// Record data does not match its type
    InvalidRecord(String),
    /// Invalid domain name
    InvalidDomainName(String),
    /// Invalid TTL value
    InvalidTTL(String),
    /// Unknown resource record type
    InvalidRRType(String),
    /// Zone text too large
    TooLarge(usize),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError(msg) => write!(f, "Zone parse error: {}", msg),
            Self::InvalidRecord(msg) => write!(f, "Invalid record: {}", msg),
            Self::InvalidDomainName(name) => write!(f, "Invalid domain name: {}", name),
            Self::InvalidTTL(ttl) => write!(f, "Invalid TTL value: {}", ttl),
            Self::InvalidRRType(rtype) => write!(f, "Invalid resource record type: {}", rtype),
            Self::TooLarge(size) => write!(f, "Zone text of {} bytes exceeds maximum size", size),
        }
    }
}

impl std::error::Error for ZoneError {}

pub type Result<T> = std::result::Result<T, ZoneError>;
