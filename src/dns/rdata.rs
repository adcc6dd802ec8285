use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::ParseError;
use super::common::{Label, encode_name, labels_to_fqdn, read_name, read_u16, read_u32};
use super::enums::DNSResourceType;

/// Decoded record data
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DNSResourceData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(Vec<Label>),
    CNAME(Vec<Label>),
    PTR(Vec<Label>),
    MX {
        preference: u16,
        exchange: Vec<Label>,
    },
    SOA {
        mname: Vec<Label>,
        rname: Vec<Label>,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    TXT(Vec<Vec<u8>>),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: Vec<Label>,
    },
    CAA {
        flags: u8,
        tag: String,
        value: Vec<u8>,
    },
    /// Anything we do not decode, kept as raw bytes (RFC 3597)
    Unknown(Vec<u8>),
}

impl DNSResourceData {
    /// Decode `len` bytes of rdata at `start`. Names may point anywhere in `buf`.
    pub fn decode(
        rtype: DNSResourceType,
        buf: &[u8],
        start: usize,
        len: usize,
    ) -> Result<Self, ParseError> {
        let end = start + len;
        let raw = buf.get(start..end).ok_or(ParseError::Truncated(start))?;

        let name_at = |pos: usize| -> Result<(Vec<Label>, usize), ParseError> {
            let (labels, next) = read_name(buf, pos)?;
            if next > end {
                return Err(ParseError::InvalidRdata(format!(
                    "{} name overruns rdata",
                    rtype
                )));
            }
            Ok((labels, next))
        };

        let data = match rtype {
            DNSResourceType::A => {
                let octets: [u8; 4] = raw
                    .try_into()
                    .map_err(|_| ParseError::InvalidRdata(format!("A rdata length {}", len)))?;
                DNSResourceData::A(Ipv4Addr::from(octets))
            }
            DNSResourceType::AAAA => {
                let octets: [u8; 16] = raw.try_into().map_err(|_| {
                    ParseError::InvalidRdata(format!("AAAA rdata length {}", len))
                })?;
                DNSResourceData::AAAA(Ipv6Addr::from(octets))
            }
            DNSResourceType::NS => DNSResourceData::NS(name_at(start)?.0),
            DNSResourceType::CNAME => DNSResourceData::CNAME(name_at(start)?.0),
            DNSResourceType::PTR => DNSResourceData::PTR(name_at(start)?.0),
            DNSResourceType::MX => {
                let preference = read_u16(buf, start)?;
                let (exchange, _) = name_at(start + 2)?;
                DNSResourceData::MX {
                    preference,
                    exchange,
                }
            }
            DNSResourceType::SOA => {
                let (mname, pos) = name_at(start)?;
                let (rname, pos) = name_at(pos)?;
                if pos + 20 > end {
                    return Err(ParseError::InvalidRdata("SOA rdata too short".to_string()));
                }
                DNSResourceData::SOA {
                    mname,
                    rname,
                    serial: read_u32(buf, pos)?,
                    refresh: read_u32(buf, pos + 4)?,
                    retry: read_u32(buf, pos + 8)?,
                    expire: read_u32(buf, pos + 12)?,
                    minimum: read_u32(buf, pos + 16)?,
                }
            }
            DNSResourceType::TXT => {
                let mut strings = Vec::new();
                let mut pos = 0;
                while pos < raw.len() {
                    let slen = raw[pos] as usize;
                    let chunk = raw.get(pos + 1..pos + 1 + slen).ok_or_else(|| {
                        ParseError::InvalidRdata("TXT string overruns rdata".to_string())
                    })?;
                    strings.push(chunk.to_vec());
                    pos += 1 + slen;
                }
                DNSResourceData::TXT(strings)
            }
            DNSResourceType::SRV => {
                if len < 7 {
                    return Err(ParseError::InvalidRdata("SRV rdata too short".to_string()));
                }
                let (target, _) = name_at(start + 6)?;
                DNSResourceData::SRV {
                    priority: read_u16(buf, start)?,
                    weight: read_u16(buf, start + 2)?,
                    port: read_u16(buf, start + 4)?,
                    target,
                }
            }
            DNSResourceType::CAA => {
                if len < 2 {
                    return Err(ParseError::InvalidRdata("CAA rdata too short".to_string()));
                }
                let tag_len = raw[1] as usize;
                let tag = raw.get(2..2 + tag_len).ok_or_else(|| {
                    ParseError::InvalidRdata("CAA tag overruns rdata".to_string())
                })?;
                DNSResourceData::CAA {
                    flags: raw[0],
                    tag: String::from_utf8_lossy(tag).into_owned(),
                    value: raw[2 + tag_len..].to_vec(),
                }
            }
            _ => DNSResourceData::Unknown(raw.to_vec()),
        };

        Ok(data)
    }

    /// Encode to uncompressed wire format
    pub fn encode(&self) -> Result<Vec<u8>, ParseError> {
        let mut out = Vec::new();
        match self {
            DNSResourceData::A(addr) => out.extend_from_slice(&addr.octets()),
            DNSResourceData::AAAA(addr) => out.extend_from_slice(&addr.octets()),
            DNSResourceData::NS(name)
            | DNSResourceData::CNAME(name)
            | DNSResourceData::PTR(name) => out.extend(encode_name(name)?),
            DNSResourceData::MX {
                preference,
                exchange,
            } => {
                out.extend_from_slice(&preference.to_be_bytes());
                out.extend(encode_name(exchange)?);
            }
            DNSResourceData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                out.extend(encode_name(mname)?);
                out.extend(encode_name(rname)?);
                for value in [serial, refresh, retry, expire, minimum] {
                    out.extend_from_slice(&value.to_be_bytes());
                }
            }
            DNSResourceData::TXT(strings) => {
                for s in strings {
                    for chunk in s.chunks(255) {
                        out.push(chunk.len() as u8);
                        out.extend_from_slice(chunk);
                    }
                }
            }
            DNSResourceData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                out.extend_from_slice(&priority.to_be_bytes());
                out.extend_from_slice(&weight.to_be_bytes());
                out.extend_from_slice(&port.to_be_bytes());
                out.extend(encode_name(target)?);
            }
            DNSResourceData::CAA { flags, tag, value } => {
                out.push(*flags);
                out.push(tag.len() as u8);
                out.extend_from_slice(tag.as_bytes());
                out.extend_from_slice(value);
            }
            DNSResourceData::Unknown(raw) => out.extend_from_slice(raw),
        }
        Ok(out)
    }
}

/// Quote a character-string, escaping quotes, backslashes and non-printables
pub fn quote_character_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\{:03}", b)),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for DNSResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceData::A(addr) => write!(f, "{}", addr),
            DNSResourceData::AAAA(addr) => write!(f, "{}", addr),
            DNSResourceData::NS(name)
            | DNSResourceData::CNAME(name)
            | DNSResourceData::PTR(name) => f.write_str(&labels_to_fqdn(name)),
            DNSResourceData::MX {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, labels_to_fqdn(exchange)),
            DNSResourceData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{} {} {} {} {} {} {}",
                labels_to_fqdn(mname),
                labels_to_fqdn(rname),
                serial,
                refresh,
                retry,
                expire,
                minimum
            ),
            DNSResourceData::TXT(strings) => {
                let quoted: Vec<String> =
                    strings.iter().map(|s| quote_character_string(s)).collect();
                f.write_str(&quoted.join(" "))
            }
            DNSResourceData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(
                f,
                "{} {} {} {}",
                priority,
                weight,
                port,
                labels_to_fqdn(target)
            ),
            DNSResourceData::CAA { flags, tag, value } => {
                write!(f, "{} {} {}", flags, tag, quote_character_string(value))
            }
            DNSResourceData::Unknown(raw) if raw.is_empty() => f.write_str("\\# 0"),
            DNSResourceData::Unknown(raw) => write!(f, "\\# {} {}", raw.len(), hex::encode(raw)),
        }
    }
}
