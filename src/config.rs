use crate::dns::enums::DNSResourceType;
use crate::error::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Where scan history is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryBackend {
    Memory,
    Redis { url: String, key_prefix: String },
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Recursive resolvers used for NS discovery and nameserver address lookup
    pub resolvers: Vec<SocketAddr>,

    /// Port authoritative nameservers are queried on
    pub nameserver_port: u16,

    /// Timeout for a single request to a single server
    pub query_timeout: Duration,

    /// Retries of a single request before the server counts as failed
    pub max_retries: u8,

    /// Record types fetched from the authoritative server
    pub record_types: Vec<DNSResourceType>,

    /// Scan history storage
    pub history_backend: HistoryBackend,

    /// Webhook receiving change notifications (None = log only)
    pub webhook_url: Option<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            resolvers: vec![
                SocketAddr::from(([1, 1, 1, 1], 53)),
                SocketAddr::from(([8, 8, 8, 8], 53)),
            ],
            nameserver_port: 53,
            query_timeout: Duration::from_secs(5),
            max_retries: 1,
            record_types: default_record_types(),
            history_backend: HistoryBackend::Memory,
            webhook_url: None,
        }
    }
}

pub fn default_record_types() -> Vec<DNSResourceType> {
    vec![
        DNSResourceType::A,
        DNSResourceType::AAAA,
        DNSResourceType::CNAME,
        DNSResourceType::NS,
        DNSResourceType::SOA,
        DNSResourceType::MX,
        DNSResourceType::SRV,
        DNSResourceType::TXT,
        DNSResourceType::CAA,
    ]
}

/// On-disk TOML layout; every key is optional and falls back to the default
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    resolvers: Option<Vec<String>>,
    nameserver_port: Option<u16>,
    query_timeout_secs: Option<u64>,
    max_retries: Option<u8>,
    record_types: Option<Vec<String>>,
    history: Option<FileHistory>,
    webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileHistory {
    backend: String,
    redis_url: Option<String>,
    key_prefix: Option<String>,
}

impl WatchConfig {
    /// Create a WatchConfig from `ZONEWATCH_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, using the environment variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(resolvers) = lookup("ZONEWATCH_RESOLVERS") {
            config.resolvers = parse_resolvers(resolvers.split(','))?;
        }

        if let Some(port) = lookup("ZONEWATCH_NAMESERVER_PORT") {
            config.nameserver_port = port.trim().parse::<u16>().map_err(|_| {
                ConfigError::ParseError(format!("Invalid nameserver port: {}", port))
            })?;
        }

        if let Some(timeout_str) = lookup("ZONEWATCH_QUERY_TIMEOUT") {
            let timeout_secs = timeout_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(timeout_str.clone()))?;
            config.query_timeout = Duration::from_secs(timeout_secs);
        }

        if let Some(retries) = lookup("ZONEWATCH_MAX_RETRIES") {
            config.max_retries = retries.trim().parse::<u8>().map_err(|_| {
                ConfigError::ParseError(format!("Invalid max retries: {}", retries))
            })?;
        }

        if let Some(types) = lookup("ZONEWATCH_RECORD_TYPES") {
            config.record_types = parse_record_types(types.split(','))?;
        }

        let redis_url = lookup("ZONEWATCH_REDIS_URL");
        let key_prefix = lookup("ZONEWATCH_REDIS_KEY_PREFIX");
        match lookup("ZONEWATCH_HISTORY_BACKEND") {
            Some(backend) => {
                config.history_backend = parse_backend(&backend, redis_url, key_prefix)?;
            }
            // A Redis URL alone is enough to select Redis
            None if redis_url.is_some() => {
                config.history_backend = parse_backend("redis", redis_url, key_prefix)?;
            }
            None => {}
        }

        if let Some(url) = lookup("ZONEWATCH_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                config.webhook_url = Some(url.trim().to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config = Self::default();

        if let Some(resolvers) = file.resolvers {
            config.resolvers = parse_resolvers(resolvers.iter().map(String::as_str))?;
        }
        if let Some(port) = file.nameserver_port {
            config.nameserver_port = port;
        }
        if let Some(secs) = file.query_timeout_secs {
            config.query_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = file.max_retries {
            config.max_retries = retries;
        }
        if let Some(types) = file.record_types {
            config.record_types = parse_record_types(types.iter().map(String::as_str))?;
        }
        if let Some(history) = file.history {
            config.history_backend =
                parse_backend(&history.backend, history.redis_url, history.key_prefix)?;
        }
        config.webhook_url = file.webhook_url.filter(|u| !u.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::Io(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolvers.is_empty() {
            return Err(ConfigError::InvalidResolver(
                "At least one resolver is required".to_string(),
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.query_timeout.as_secs() > 300 {
            return Err(ConfigError::InvalidTimeout(
                "Timeout too large (max 300 seconds)".to_string(),
            ));
        }

        if self.record_types.is_empty() {
            return Err(ConfigError::InvalidRecordType(
                "At least one record type is required".to_string(),
            ));
        }

        if self.nameserver_port == 0 {
            return Err(ConfigError::ParseError(
                "Nameserver port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_resolvers<'a, I>(entries: I) -> Result<Vec<SocketAddr>, ConfigError>
where
    I: Iterator<Item = &'a str>,
{
    entries
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            // A bare IP gets the standard port
            s.parse::<SocketAddr>()
                .or_else(|_| s.parse::<std::net::IpAddr>().map(|ip| SocketAddr::new(ip, 53)))
                .map_err(|_| ConfigError::InvalidResolver(s.to_string()))
        })
        .collect()
}

fn parse_record_types<'a, I>(entries: I) -> Result<Vec<DNSResourceType>, ConfigError>
where
    I: Iterator<Item = &'a str>,
{
    let mut types = Vec::new();
    for entry in entries.map(str::trim).filter(|s| !s.is_empty()) {
        let rtype = entry
            .parse::<DNSResourceType>()
            .map_err(ConfigError::InvalidRecordType)?;
        if matches!(
            rtype,
            DNSResourceType::ANY | DNSResourceType::AXFR | DNSResourceType::OPT
        ) {
            return Err(ConfigError::InvalidRecordType(format!(
                "{} cannot be fetched as a record set",
                entry
            )));
        }
        if !types.contains(&rtype) {
            types.push(rtype);
        }
    }
    Ok(types)
}

fn parse_backend(
    backend: &str,
    redis_url: Option<String>,
    key_prefix: Option<String>,
) -> Result<HistoryBackend, ConfigError> {
    match backend.trim().to_lowercase().as_str() {
        "memory" => Ok(HistoryBackend::Memory),
        "redis" => {
            let url = redis_url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                ConfigError::InvalidBackend("redis backend requires a redis URL".to_string())
            })?;
            Ok(HistoryBackend::Redis {
                url,
                key_prefix: key_prefix.unwrap_or_else(|| "zonewatch".to_string()),
            })
        }
        other => Err(ConfigError::InvalidBackend(other.to_string())),
    }
}
