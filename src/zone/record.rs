use super::parser::parse_ttl;
use super::{Result, ZoneError};
use crate::dns::common::{Label, labels_to_fqdn, split_name};
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use crate::dns::rdata::quote_character_string;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A single resource record in canonical form.
///
/// Owner names and domain names inside the rdata are lowercase and fully
/// qualified; the rdata is re-rendered from its parsed fields so equivalent
/// input spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneRecord {
    /// Fully qualified owner name with trailing dot
    pub name: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Record class (usually IN)
    pub class: DNSResourceClass,
    /// Record type (A, AAAA, MX, etc.)
    pub rtype: DNSResourceType,
    /// Canonical record data
    pub rdata: String,
}

impl ZoneRecord {
    /// Build a record from rdata tokens, validating them against `rtype`.
    /// Relative names in the rdata are completed with `origin`.
    pub fn new(
        name: &str,
        ttl: u32,
        class: DNSResourceClass,
        rtype: DNSResourceType,
        rdata: &[String],
        origin: &str,
    ) -> Result<Self> {
        let name = qualify_name(name, origin)?;
        let rdata = canonical_rdata(rtype, rdata, origin)
            .map_err(|e| ZoneError::InvalidRecord(format!("{} {}: {}", name, rtype, e)))?;

        Ok(Self {
            name,
            ttl,
            class,
            rtype,
            rdata,
        })
    }

    /// SOA serial, if this is an SOA record
    pub fn soa_serial(&self) -> Option<u32> {
        if self.rtype != DNSResourceType::SOA {
            return None;
        }
        self.rdata.split_whitespace().nth(2)?.parse().ok()
    }
}

/// Make `name` fully qualified and lowercase. `@` is the origin.
///
/// Labels are split with `\X` and `\DDD` escapes understood, and the result
/// is re-rendered with the same escaping the DNS layer uses.
pub fn qualify_name(name: &str, origin: &str) -> Result<String> {
    let name = name.trim();
    let (mut labels, absolute) = if name == "@" || name.is_empty() {
        (Vec::new(), false)
    } else {
        split_name(name)
    };
    if !absolute {
        labels.extend(split_name(origin).0);
    }

    validate_labels(name, &labels)?;
    for label in &mut labels {
        label.make_ascii_lowercase();
    }
    Ok(labels_to_fqdn(&labels))
}

fn validate_labels(name: &str, labels: &[Label]) -> Result<()> {
    // Length octets plus the root label
    let wire_len = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
    if wire_len > 255 {
        return Err(ZoneError::InvalidDomainName(format!(
            "{} exceeds 255 bytes",
            name
        )));
    }
    if labels.iter().any(|l| l.is_empty() || l.len() > 63) {
        return Err(ZoneError::InvalidDomainName(name.to_string()));
    }
    Ok(())
}

/// Validate rdata tokens for `rtype` and render them canonically
fn canonical_rdata(
    rtype: DNSResourceType,
    tokens: &[String],
    origin: &str,
) -> std::result::Result<String, String> {
    let name = |token: &str| qualify_name(token, origin).map_err(|e| e.to_string());

    match rtype {
        DNSResourceType::A => {
            let [addr] = expect_fields::<1>(tokens, "A")?;
            let addr: Ipv4Addr = addr
                .parse()
                .map_err(|_| format!("Invalid IPv4 address: {}", addr))?;
            Ok(addr.to_string())
        }
        DNSResourceType::AAAA => {
            let [addr] = expect_fields::<1>(tokens, "AAAA")?;
            let addr: Ipv6Addr = addr
                .parse()
                .map_err(|_| format!("Invalid IPv6 address: {}", addr))?;
            Ok(addr.to_string())
        }
        DNSResourceType::NS | DNSResourceType::CNAME | DNSResourceType::PTR => {
            let [target] = expect_fields::<1>(tokens, "name")?;
            name(target)
        }
        DNSResourceType::MX => {
            let [preference, exchange] = expect_fields::<2>(tokens, "MX")?;
            let preference = parse_number::<u16>(preference, "MX preference")?;
            Ok(format!("{} {}", preference, name(exchange)?))
        }
        DNSResourceType::SOA => {
            let [mname, rname, serial, refresh, retry, expire, minimum] =
                expect_fields::<7>(tokens, "SOA")?;
            let serial = parse_number::<u32>(serial, "SOA serial")?;
            let mut timers = Vec::with_capacity(4);
            for value in [refresh, retry, expire, minimum] {
                timers.push(parse_ttl(value).map_err(|e| e.to_string())?);
            }
            Ok(format!(
                "{} {} {} {} {} {} {}",
                name(mname)?,
                name(rname)?,
                serial,
                timers[0],
                timers[1],
                timers[2],
                timers[3]
            ))
        }
        DNSResourceType::TXT => {
            if tokens.is_empty() {
                return Err("TXT record requires at least one string".to_string());
            }
            let quoted = tokens
                .iter()
                .map(|t| parse_character_string(t).map(|bytes| quote_character_string(&bytes)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(quoted.join(" "))
        }
        DNSResourceType::SRV => {
            let [priority, weight, port, target] = expect_fields::<4>(tokens, "SRV")?;
            Ok(format!(
                "{} {} {} {}",
                parse_number::<u16>(priority, "SRV priority")?,
                parse_number::<u16>(weight, "SRV weight")?,
                parse_number::<u16>(port, "SRV port")?,
                name(target)?
            ))
        }
        DNSResourceType::CAA => {
            let [flags, tag, value] = expect_fields::<3>(tokens, "CAA")?;
            let flags = parse_number::<u8>(flags, "CAA flags")?;
            if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(format!("Invalid CAA tag: {}", tag));
            }
            let value = parse_character_string(value)?;
            Ok(format!(
                "{} {} {}",
                flags,
                tag.to_lowercase(),
                quote_character_string(&value)
            ))
        }
        _ => {
            if tokens.is_empty() {
                return Err(format!("{} record has no data", rtype));
            }
            Ok(tokens.join(" "))
        }
    }
}

fn expect_fields<'a, const N: usize>(
    tokens: &'a [String],
    what: &str,
) -> std::result::Result<[&'a str; N], String> {
    if tokens.len() != N {
        return Err(format!(
            "{} record requires {} fields, got {}",
            what,
            N,
            tokens.len()
        ));
    }
    let mut fields = [""; N];
    for (field, token) in fields.iter_mut().zip(tokens) {
        *field = token.as_str();
    }
    Ok(fields)
}

fn parse_number<T: std::str::FromStr>(s: &str, what: &str) -> std::result::Result<T, String> {
    s.parse().map_err(|_| format!("Invalid {}: {}", what, s))
}

/// Decode a (possibly quoted) character-string, resolving `\X` and `\DDD` escapes
pub fn parse_character_string(token: &str) -> std::result::Result<Vec<u8>, String> {
    let inner = if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        &token[1..token.len() - 1]
    } else {
        token
    };

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let escaped = bytes
            .get(i + 1..)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| format!("Dangling escape in {}", token))?;

        if escaped.len() >= 3 && escaped[..3].iter().all(u8::is_ascii_digit) {
            let value = (escaped[0] - b'0') as u16 * 100
                + (escaped[1] - b'0') as u16 * 10
                + (escaped[2] - b'0') as u16;
            let value =
                u8::try_from(value).map_err(|_| format!("Escape out of range in {}", token))?;
            out.push(value);
            i += 4;
        } else {
            out.push(escaped[0]);
            i += 2;
        }
    }

    if out.len() > 255 {
        return Err(format!("Character-string longer than 255 bytes: {}", token));
    }
    Ok(out)
}
