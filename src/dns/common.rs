use bitstream_io::{BitWrite, BitWriter, Endianness};

use super::ParseError;

/// Maximum number of compression pointers followed while reading one name
const MAX_POINTER_JUMPS: usize = 16;

/// One wire-format label. Labels are arbitrary octets, not text.
pub type Label = Vec<u8>;

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;

    /// Read the component starting at `offset` of the full packet buffer.
    /// Returns the offset just past the component.
    fn read(&mut self, buf: &[u8], offset: usize) -> Result<usize, ParseError>;

    fn write_labels<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        labels: &[Label],
    ) -> Result<(), ParseError> {
        write_labels(writer, labels)
    }
}

/// Write an uncompressed name followed by the root label
pub fn write_labels<E: Endianness>(
    writer: &mut BitWriter<&mut Vec<u8>, E>,
    labels: &[Label],
) -> Result<(), ParseError> {
    for label in labels.iter().filter(|l| !l.is_empty()) {
        if label.len() > 63 {
            return Err(ParseError::InvalidLabel);
        }
        writer.write_var::<u8>(8, label.len() as u8)?;
        writer.write_bytes(label)?;
    }
    writer.write_var::<u8>(8, 0)?;
    Ok(())
}

/// Encode a name into a plain byte vector (used when building rdata)
pub fn encode_name(labels: &[Label]) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::new();
    for label in labels.iter().filter(|l| !l.is_empty()) {
        if label.len() > 63 {
            return Err(ParseError::InvalidLabel);
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label);
    }
    out.push(0);
    Ok(out)
}

/// Read a possibly compressed name at `start`.
///
/// Returns the labels (root label excluded) and the offset just past the name
/// in the original position, i.e. after the first pointer if one was followed.
pub fn read_name(buf: &[u8], start: usize) -> Result<(Vec<Label>, usize), ParseError> {
    let mut labels = Vec::new();
    let mut offset = start;
    let mut end_offset = None;
    let mut jumps = 0;
    let mut total_len = 0usize;

    loop {
        let len = *buf.get(offset).ok_or(ParseError::InvalidLabel)?;

        if (len & 0xC0) == 0xC0 {
            let low = *buf.get(offset + 1).ok_or(ParseError::InvalidLabel)?;
            if end_offset.is_none() {
                end_offset = Some(offset + 2);
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(ParseError::InvalidLabel);
            }
            offset = u16::from_be_bytes([len & 0x3F, low]) as usize;
            continue;
        }

        if len == 0 {
            return Ok((labels, end_offset.unwrap_or(offset + 1)));
        }

        if len > 63 {
            return Err(ParseError::InvalidLabel);
        }

        let label_start = offset + 1;
        let label_end = label_start + len as usize;
        let raw = buf
            .get(label_start..label_end)
            .ok_or(ParseError::InvalidLabel)?;

        total_len += raw.len() + 1;
        if total_len > 255 {
            return Err(ParseError::InvalidLabel);
        }

        labels.push(raw.to_vec());
        offset = label_end;
    }
}

/// Render labels as a fully qualified name with trailing dot.
///
/// Dots and other delimiters inside a label are escaped as `\X`; bytes
/// outside printable ASCII (including space) become `\DDD`.
pub fn labels_to_fqdn(labels: &[Label]) -> String {
    format!("{}.", escape_labels(labels))
}

/// Render labels in presentation form, joined by dots, without the root dot
pub fn escape_labels(labels: &[Label]) -> String {
    let mut out = String::new();
    for label in labels.iter().filter(|l| !l.is_empty()) {
        if !out.is_empty() {
            out.push('.');
        }
        for &byte in label {
            match byte {
                b'.' | b'\\' | b'"' | b';' | b'(' | b')' | b'@' | b'$' => {
                    out.push('\\');
                    out.push(byte as char);
                }
                0x21..=0x7E => out.push(byte as char),
                _ => out.push_str(&format!("\\{:03}", byte)),
            }
        }
    }
    out
}

/// Split a presentation-form name into raw labels.
///
/// Understands `\X` and `\DDD` escapes, so an escaped dot stays inside its
/// label. Empty labels between dots are kept for the caller to reject. The
/// flag is true when the name ends in an unescaped dot.
pub fn split_name(name: &str) -> (Vec<Label>, bool) {
    if name == "." {
        return (Vec::new(), true);
    }

    let bytes = name.as_bytes();
    let mut labels = Vec::new();
    let mut current = Vec::new();
    let mut absolute = false;
    let mut i = 0;

    while i < bytes.len() {
        absolute = false;
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                let digits = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(u8::is_ascii_digit));
                let decimal = digits
                    .and_then(|d| std::str::from_utf8(d).ok())
                    .and_then(|d| d.parse::<u8>().ok());
                match decimal {
                    Some(byte) => {
                        current.push(byte);
                        i += 4;
                    }
                    None => {
                        current.push(bytes[i + 1]);
                        i += 2;
                    }
                }
                continue;
            }
            b'.' => {
                labels.push(std::mem::take(&mut current));
                absolute = true;
            }
            byte => current.push(byte),
        }
        i += 1;
    }

    if !current.is_empty() {
        labels.push(current);
    }
    (labels, absolute)
}

/// Split a textual name into labels, ignoring the trailing root dot
pub fn name_to_labels(name: &str) -> Vec<Label> {
    split_name(name)
        .0
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect()
}

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ParseError> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(ParseError::Truncated(offset))
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ParseError> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ParseError::Truncated(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(labels: &[Label]) -> Vec<String> {
        labels
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect()
    }

    #[test]
    fn test_read_plain_name() {
        let buf = b"\x03www\x07example\x03com\x00";
        let (labels, end) = read_name(buf, 0).unwrap();
        assert_eq!(text(&labels), vec!["www", "example", "com"]);
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_read_compressed_name() {
        // "example.com" at 0, then "www" + pointer to 0 at 13
        let mut buf = b"\x07example\x03com\x00".to_vec();
        buf.extend_from_slice(b"\x03www\xC0\x00");
        let (labels, end) = read_name(&buf, 13).unwrap();
        assert_eq!(text(&labels), vec!["www", "example", "com"]);
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_pointer_loop_is_rejected() {
        let buf = [0xC0u8, 0x00];
        assert!(read_name(&buf, 0).is_err());
    }

    #[test]
    fn test_truncated_name_is_rejected() {
        let buf = b"\x07exam";
        assert!(read_name(buf, 0).is_err());
    }

    #[test]
    fn test_fqdn_helpers() {
        let labels = name_to_labels("Mail.Example.com.");
        assert_eq!(text(&labels), vec!["Mail", "Example", "com"]);
        assert_eq!(labels_to_fqdn(&labels), "Mail.Example.com.");
        assert_eq!(labels_to_fqdn(&[]), ".");
    }

    #[test]
    fn test_label_bytes_are_escaped() {
        // Dot inside a label, space, and a non-UTF-8 byte
        let buf = b"\x06mail.x\x0ajohn smith\x02\xff;\x00";
        let (labels, _) = read_name(buf, 0).unwrap();
        assert_eq!(labels[0], b"mail.x");
        assert_eq!(labels[2], vec![0xFF, b';']);
        assert_eq!(labels_to_fqdn(&labels), "mail\\.x.john\\032smith.\\255\\;.");
    }

    #[test]
    fn test_split_name_understands_escapes() {
        let (labels, absolute) = split_name("mail\\.x.john\\032smith.com.");
        assert!(absolute);
        assert_eq!(labels, vec![b"mail.x".to_vec(), b"john smith".to_vec(), b"com".to_vec()]);

        let (labels, absolute) = split_name("a\\.");
        assert!(!absolute);
        assert_eq!(labels, vec![b"a.".to_vec()]);

        // Escaped and unescaped dots name different things
        assert_ne!(name_to_labels("mail\\.x.example.com."), name_to_labels("mail.x.example.com."));
        let escaped = labels_to_fqdn(&name_to_labels("mail\\.x.example.com."));
        assert_eq!(escaped, "mail\\.x.example.com.");

        let (labels, _) = split_name("a..b.");
        assert_eq!(labels.len(), 3);
        assert!(labels[1].is_empty());
    }
}
