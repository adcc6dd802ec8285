//! Values threaded through the scan pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A domain being watched and the account that owns it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitoredDomain {
    /// Apex hostname, lowercase, without trailing dot
    pub apex: String,
    /// Owning account or user identifier
    pub owner: String,
}

impl MonitoredDomain {
    pub fn new(apex: &str, owner: &str) -> Self {
        Self {
            apex: apex.trim().trim_end_matches('.').to_lowercase(),
            owner: owner.to_string(),
        }
    }

    /// Zone origin: the apex with the root label
    pub fn origin(&self) -> String {
        format!("{}.", self.apex)
    }
}

impl fmt::Display for MonitoredDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.apex)
    }
}

/// Records fetched from one authoritative nameserver, one presentation line each
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecordSet {
    /// Nameserver that produced the answer
    pub nameserver: String,
    pub lines: Vec<String>,
}

impl RawRecordSet {
    pub fn new(nameserver: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            nameserver: nameserver.into(),
            lines,
        }
    }

    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Deterministic serialized zone, the unit of storage and comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalText(String);

impl CanonicalText {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
