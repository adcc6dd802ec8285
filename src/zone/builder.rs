use super::{Zone, ZoneRecord};
use crate::dns::enums::DNSResourceType;
use std::fmt::Write;

/// Fixed section order; anything else follows sorted by type code
const TYPE_ORDER: [DNSResourceType; 9] = [
    DNSResourceType::NS,
    DNSResourceType::A,
    DNSResourceType::AAAA,
    DNSResourceType::CNAME,
    DNSResourceType::MX,
    DNSResourceType::TXT,
    DNSResourceType::SRV,
    DNSResourceType::CAA,
    DNSResourceType::PTR,
];

const SOA_FIELDS: [&str; 5] = ["serial", "refresh", "retry", "expire", "minimum"];

/// Serializes a [`Zone`] into aligned, grouped zone-file text.
///
/// Output depends only on the set of records in the zone: equal zones give
/// byte-identical text.
pub struct AlignedBuilder<'a> {
    zone: &'a Zone,
    widths: Widths,
}

#[derive(Debug, Default, Clone, Copy)]
struct Widths {
    name: usize,
    ttl: usize,
    class: usize,
    rtype: usize,
}

impl<'a> AlignedBuilder<'a> {
    pub fn new(zone: &'a Zone) -> Self {
        let mut widths = Widths::default();
        for record in zone.records() {
            widths.name = widths.name.max(zone.relative_name(&record.name).len());
            widths.ttl = widths.ttl.max(record.ttl.to_string().len());
            widths.class = widths.class.max(record.class.to_string().len());
            widths.rtype = widths.rtype.max(record.rtype.to_string().len());
        }
        Self { zone, widths }
    }

    /// Convenience for `AlignedBuilder::new(zone).build()`
    pub fn render(zone: &Zone) -> String {
        AlignedBuilder::new(zone).build()
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "$ORIGIN {}", self.zone.origin);

        let soa: Vec<&ZoneRecord> = self.sorted(DNSResourceType::SOA);
        if !soa.is_empty() {
            out.push('\n');
            for record in soa {
                self.write_soa(&mut out, record);
            }
        }

        for rtype in self.section_order() {
            let records = self.sorted(rtype);
            if records.is_empty() {
                continue;
            }
            out.push('\n');
            let _ = writeln!(out, "; {} RECORDS", rtype);
            for record in records {
                let _ = writeln!(out, "{} {}", self.prefix(record), record.rdata);
            }
        }

        out
    }

    /// NS..PTR first, then remaining types present in the zone by numeric code
    fn section_order(&self) -> Vec<DNSResourceType> {
        let mut rest: Vec<DNSResourceType> = self
            .zone
            .records()
            .map(|r| r.rtype)
            .filter(|t| *t != DNSResourceType::SOA && !TYPE_ORDER.contains(t))
            .collect();
        rest.sort_by_key(|t| u16::from(*t));
        rest.dedup();

        TYPE_ORDER.iter().copied().chain(rest).collect()
    }

    /// Records of one type sorted by owner, then rdata
    fn sorted(&self, rtype: DNSResourceType) -> Vec<&'a ZoneRecord> {
        let mut records: Vec<&ZoneRecord> = self.zone.records_of(rtype).collect();
        records.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.rdata.cmp(&b.rdata))
                .then_with(|| a.ttl.cmp(&b.ttl))
                .then_with(|| a.class.cmp(&b.class))
        });
        records
    }

    fn prefix(&self, record: &ZoneRecord) -> String {
        let w = self.widths;
        format!(
            "{:<nw$} {:<tw$} {:<cw$} {:<rw$}",
            self.zone.relative_name(&record.name),
            record.ttl,
            record.class.to_string(),
            record.rtype.to_string(),
            nw = w.name,
            tw = w.ttl,
            cw = w.class,
            rw = w.rtype,
        )
    }

    /// SOA in multi-line form, one commented timer per line
    fn write_soa(&self, out: &mut String, record: &ZoneRecord) {
        let fields: Vec<&str> = record.rdata.split_whitespace().collect();
        if fields.len() != 7 {
            let _ = writeln!(out, "{} {}", self.prefix(record), record.rdata);
            return;
        }

        let prefix = self.prefix(record);
        let _ = writeln!(out, "{} {} {} (", prefix, fields[0], fields[1]);

        let indent = " ".repeat(prefix.len() + 1);
        let value_width = fields[2..].iter().map(|f| f.len()).max().unwrap_or(0);
        for (value, label) in fields[2..].iter().zip(SOA_FIELDS) {
            let _ = writeln!(out, "{}{:<vw$} ; {}", indent, value, label, vw = value_width);
        }
        let _ = writeln!(out, "{})", indent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::ZoneParser;

    fn build(contents: &str) -> String {
        let zone = ZoneParser::new("example.com").parse(contents).unwrap();
        AlignedBuilder::render(&zone)
    }

    #[test]
    fn test_empty_zone() {
        assert_eq!(build(""), "$ORIGIN example.com.\n");
    }

    #[test]
    fn test_aligned_layout() {
        let text = build(
            "www.example.com. 300 IN A 192.0.2.10\n\
             example.com. 86400 IN NS ns1.example.net.\n\
             example.com. 300 IN A 192.0.2.1\n\
             example.com. 3600 IN SOA ns1.example.net. hostmaster.example.com. 2024010101 7200 3600 1209600 300\n",
        );

        // Owner column is as wide as the widest owner ("www"), TTL as "86400"
        let pad = " ".repeat(17);
        let expected = format!(
            "$ORIGIN example.com.\n\
             \n\
             @   3600  IN SOA ns1.example.net. hostmaster.example.com. (\n\
             {pad}2024010101 ; serial\n\
             {pad}7200       ; refresh\n\
             {pad}3600       ; retry\n\
             {pad}1209600    ; expire\n\
             {pad}300        ; minimum\n\
             {pad})\n\
             \n\
             ; NS RECORDS\n\
             @   86400 IN NS  ns1.example.net.\n\
             \n\
             ; A RECORDS\n\
             @   300   IN A   192.0.2.1\n\
             www 300   IN A   192.0.2.10\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_order_independent() {
        let a = build(
            "example.com. 300 IN A 192.0.2.2\n\
             example.com. 300 IN TXT \"b\"\n\
             example.com. 300 IN A 192.0.2.1\n\
             example.com. 300 IN MX 10 mail.example.com.\n",
        );
        let b = build(
            "example.com.   300 IN MX 10 MAIL.example.com.\n\
             example.com. 300 IN A 192.0.2.1\n\
             example.com. 300 in a 192.0.2.2\n\
             example.com. 300 IN TXT b\n\
             example.com. 300 IN A 192.0.2.1\n",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_group_order_and_unknown_types() {
        let text = build(
            "example.com. 300 IN TYPE65 \\# 1 00\n\
             example.com. 300 IN CAA 0 issue \"ca.example\"\n\
             example.com. 300 IN AAAA 2001:db8::1\n\
             example.com. 300 IN TYPE260 \\# 1 01\n\
             example.com. 300 IN A 192.0.2.1\n",
        );

        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("; ")).collect();
        assert_eq!(
            headers,
            vec![
                "; A RECORDS",
                "; AAAA RECORDS",
                "; CAA RECORDS",
                "; HTTPS RECORDS",
                "; TYPE260 RECORDS"
            ]
        );
        assert!(text.ends_with('\n'));
    }
}
