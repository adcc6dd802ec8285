use super::ZoneRecord;
use crate::dns::common::{Label, escape_labels, name_to_labels};
use crate::dns::enums::DNSResourceType;
use std::collections::BTreeSet;

/// Represents a DNS zone with all its records.
///
/// Records are held in a sorted set so iteration order never depends on the
/// order the answers arrived in, and exact duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zone {
    /// Zone origin, lowercase with trailing dot (e.g. "example.com.")
    pub origin: String,
    records: BTreeSet<ZoneRecord>,
}

impl Zone {
    /// Create a new empty zone
    pub fn new(origin: &str) -> Self {
        let origin = origin.trim().trim_end_matches('.').to_lowercase();
        Self {
            origin: format!("{}.", origin),
            records: BTreeSet::new(),
        }
    }

    /// Add a record; returns false if an identical record was already present
    pub fn add_record(&mut self, record: ZoneRecord) -> bool {
        self.records.insert(record)
    }

    pub fn records(&self) -> impl Iterator<Item = &ZoneRecord> {
        self.records.iter()
    }

    /// All records of one type, in owner order
    pub fn records_of(&self, rtype: DNSResourceType) -> impl Iterator<Item = &ZoneRecord> {
        self.records.iter().filter(move |r| r.rtype == rtype)
    }

    /// The first SOA record at the origin, if any
    pub fn soa(&self) -> Option<&ZoneRecord> {
        self.records_of(DNSResourceType::SOA)
            .find(|r| r.name == self.origin)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if this zone is authoritative for a given name.
    /// Compares whole labels, so an escaped dot never matches a boundary.
    pub fn is_authoritative_for(&self, name: &str) -> bool {
        let labels = lowercase_labels(name);
        labels.ends_with(&lowercase_labels(&self.origin))
    }

    /// Owner name as written in the zone: `@` for the origin, relative inside it
    pub fn relative_name(&self, name: &str) -> String {
        let labels = lowercase_labels(name);
        let origin = lowercase_labels(&self.origin);
        if labels == origin {
            "@".to_string()
        } else if !origin.is_empty() && labels.ends_with(&origin) {
            escape_labels(&labels[..labels.len() - origin.len()])
        } else {
            name.to_string()
        }
    }

    /// Get zone statistics
    pub fn stats(&self) -> ZoneStats {
        let mut stats = ZoneStats::default();

        for record in &self.records {
            stats.total_records += 1;
            match record.rtype {
                DNSResourceType::A => stats.a_records += 1,
                DNSResourceType::AAAA => stats.aaaa_records += 1,
                DNSResourceType::NS => stats.ns_records += 1,
                DNSResourceType::CNAME => stats.cname_records += 1,
                DNSResourceType::MX => stats.mx_records += 1,
                DNSResourceType::TXT => stats.txt_records += 1,
                DNSResourceType::SOA => stats.soa_records += 1,
                _ => stats.other_records += 1,
            }
        }

        stats
    }
}

/// Zone statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ZoneStats {
    pub total_records: usize,
    pub a_records: usize,
    pub aaaa_records: usize,
    pub ns_records: usize,
    pub cname_records: usize,
    pub mx_records: usize,
    pub txt_records: usize,
    pub soa_records: usize,
    pub other_records: usize,
}

fn lowercase_labels(name: &str) -> Vec<Label> {
    let mut labels = name_to_labels(name);
    for label in &mut labels {
        label.make_ascii_lowercase();
    }
    labels
}
