use super::{Result, Zone, ZoneError, ZoneRecord, constants};
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use tracing::{debug, trace};

/// RFC 1035 presentation-format parser
pub struct ZoneParser {
    /// Zone apex the result is built for
    zone_origin: String,
    /// Current origin for relative names
    current_origin: String,
    /// Current default TTL
    current_ttl: Option<u32>,
    /// Current class
    current_class: DNSResourceClass,
    /// Owner of the previous record, inherited by indented lines
    last_owner: Option<String>,
}

/// One record or directive after parentheses and comments are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogicalLine {
    /// First physical line number
    line_number: usize,
    /// Line began with whitespace, so the owner is inherited
    inherits_owner: bool,
    tokens: Vec<String>,
}

impl ZoneParser {
    /// Create a parser for the zone rooted at `origin`
    pub fn new(origin: &str) -> Self {
        let origin = format!("{}.", origin.trim().trim_end_matches('.').to_lowercase());
        Self {
            zone_origin: origin.clone(),
            current_origin: origin,
            current_ttl: None,
            current_class: DNSResourceClass::IN,
            last_owner: None,
        }
    }

    /// Parse zone contents
    pub fn parse(&mut self, contents: &str) -> Result<Zone> {
        if contents.len() > constants::MAX_ZONE_TEXT_SIZE {
            return Err(ZoneError::TooLarge(contents.len()));
        }

        let mut zone = Zone::new(&self.zone_origin);
        let mut duplicates = 0usize;

        for line in logical_lines(contents)? {
            trace!("Parsing line {}: {:?}", line.line_number, line.tokens);

            // Handle directives
            if !line.inherits_owner && line.tokens[0].starts_with('$') {
                self.parse_directive(&line.tokens)
                    .map_err(|e| at_line(line.line_number, e))?;
                continue;
            }

            let record = self
                .parse_record(&line)
                .map_err(|e| at_line(line.line_number, e))?;
            if !zone.add_record(record) {
                duplicates += 1;
            }
        }

        debug!(
            "Parsed zone {} with {} records ({} duplicates dropped)",
            zone.origin,
            zone.stats().total_records,
            duplicates
        );

        Ok(zone)
    }

    /// Parse a directive line
    fn parse_directive(&mut self, parts: &[String]) -> Result<()> {
        match parts[0].to_uppercase().as_str() {
            "$ORIGIN" => {
                let origin = parts.get(1).ok_or_else(|| {
                    ZoneError::ParseError("$ORIGIN requires domain name".to_string())
                })?;
                self.current_origin = super::record::qualify_name(origin, &self.current_origin)?;
                debug!("Set origin to: {}", self.current_origin);
            }
            "$TTL" => {
                let ttl = parts
                    .get(1)
                    .ok_or_else(|| ZoneError::ParseError("$TTL requires value".to_string()))?;
                let ttl = parse_ttl(ttl)?;
                self.current_ttl = Some(ttl);
                debug!("Set default TTL to: {}", ttl);
            }
            other => {
                return Err(ZoneError::ParseError(format!(
                    "Unsupported directive: {}",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Parse a resource record: `[owner] [ttl] [class] type rdata...`
    fn parse_record(&mut self, line: &LogicalLine) -> Result<ZoneRecord> {
        let parts = &line.tokens;
        let mut idx = 0;

        let name = if line.inherits_owner {
            self.last_owner.clone().ok_or_else(|| {
                ZoneError::ParseError("Record inherits owner but none precedes it".to_string())
            })?
        } else {
            idx += 1;
            super::record::qualify_name(&parts[0], &self.current_origin)?
        };

        let mut ttl = None;
        let mut class = self.current_class;
        let mut rtype = None;

        // TTL and class may appear in either order before the type
        while idx < parts.len() && rtype.is_none() {
            let field = &parts[idx];
            idx += 1;

            if let Ok(ttl_value) = parse_ttl(field) {
                ttl = Some(ttl_value);
                continue;
            }

            if let Ok(parsed_class) = field.parse::<DNSResourceClass>() {
                class = parsed_class;
                continue;
            }

            match field.parse::<DNSResourceType>() {
                Ok(parsed_type) => rtype = Some(parsed_type),
                Err(_) => return Err(ZoneError::InvalidRRType(field.to_string())),
            }
        }

        // Type is required
        let rtype =
            rtype.ok_or_else(|| ZoneError::ParseError("Missing record type".to_string()))?;

        // Without an explicit TTL fall back to $TTL, then the previous record's TTL
        let ttl = match ttl {
            Some(ttl) => {
                if self.current_ttl.is_none() {
                    self.current_ttl = Some(ttl);
                }
                ttl
            }
            None => self.current_ttl.unwrap_or(constants::DEFAULT_TTL),
        };

        self.current_class = class;
        self.last_owner = Some(name.clone());

        ZoneRecord::new(
            &name,
            ttl,
            class,
            rtype,
            &parts[idx..],
            &self.current_origin,
        )
    }
}

fn flush_token(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

fn at_line(line_number: usize, err: ZoneError) -> ZoneError {
    match err {
        ZoneError::ParseError(msg) => ZoneError::ParseError(format!("Line {}: {}", line_number, msg)),
        ZoneError::InvalidRecord(msg) => {
            ZoneError::InvalidRecord(format!("Line {}: {}", line_number, msg))
        }
        other => other,
    }
}

/// Parse a TTL with optional unit suffix (s, m, h, d, w)
pub fn parse_ttl(s: &str) -> Result<u32> {
    let lower = s.to_lowercase();
    let invalid = || ZoneError::InvalidTTL(s.to_string());

    let (digits, multiplier) = match lower.chars().last() {
        Some('s') => (&lower[..lower.len() - 1], 1u32),
        Some('m') => (&lower[..lower.len() - 1], 60),
        Some('h') => (&lower[..lower.len() - 1], 3600),
        Some('d') => (&lower[..lower.len() - 1], 86400),
        Some('w') => (&lower[..lower.len() - 1], 604800),
        _ => (lower.as_str(), 1),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits
        .parse::<u32>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}

/// Split presentation text into logical lines.
///
/// Comments run from an unquoted `;` to end of line. Parentheses join physical
/// lines and are dropped. Quoted strings keep their quotes and escapes and may
/// contain whitespace, `;` and parentheses. Outside quotes a backslash keeps
/// the next character in the current token, escape included.
fn logical_lines(contents: &str) -> Result<Vec<LogicalLine>> {
    let mut lines = Vec::new();
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut line_number = 1;
    let mut start_line = 1;
    let mut inherits_owner = false;
    let mut at_line_start = true;
    let mut in_quotes = false;
    let mut in_comment = false;
    let mut escaped = false;
    let mut paren_depth = 0usize;

    for ch in contents.chars() {
        if at_line_start && paren_depth == 0 && tokens.is_empty() && current.is_empty() {
            inherits_owner = ch == ' ' || ch == '\t';
            start_line = line_number;
            at_line_start = false;
        }

        if ch == '\n' {
            if in_quotes {
                return Err(ZoneError::ParseError(format!(
                    "Line {}: unterminated quoted string",
                    line_number
                )));
            }
            in_comment = false;
            escaped = false;
            flush_token(&mut current, &mut tokens);
            if paren_depth == 0 {
                if !tokens.is_empty() {
                    lines.push(LogicalLine {
                        line_number: start_line,
                        inherits_owner,
                        tokens: std::mem::take(&mut tokens),
                    });
                }
                at_line_start = true;
            }
            line_number += 1;
            continue;
        }

        if in_comment {
            continue;
        }

        if in_quotes {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
            continue;
        }

        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => {
                current.push(ch);
                escaped = true;
            }
            ';' => {
                flush_token(&mut current, &mut tokens);
                in_comment = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = true;
            }
            '(' => {
                flush_token(&mut current, &mut tokens);
                paren_depth += 1;
            }
            ')' => {
                flush_token(&mut current, &mut tokens);
                paren_depth = paren_depth.checked_sub(1).ok_or_else(|| {
                    ZoneError::ParseError(format!("Line {}: unbalanced ')'", line_number))
                })?;
            }
            ' ' | '\t' | '\r' => flush_token(&mut current, &mut tokens),
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(ZoneError::ParseError(format!(
            "Line {}: unterminated quoted string",
            line_number
        )));
    }

    // Check for unclosed parentheses
    if paren_depth > 0 {
        return Err(ZoneError::ParseError(format!(
            "Unclosed parentheses starting at line {}",
            start_line
        )));
    }

    flush_token(&mut current, &mut tokens);
    if !tokens.is_empty() {
        lines.push(LogicalLine {
            line_number: start_line,
            inherits_owner,
            tokens,
        });
    }

    Ok(lines)
}
