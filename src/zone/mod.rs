pub mod builder;
pub mod errors;
pub mod parser;
pub mod record;
#[allow(clippy::module_inception)]
pub mod zone;

pub use builder::AlignedBuilder;
pub use errors::{Result, ZoneError};
pub use parser::ZoneParser;
pub use record::ZoneRecord;
pub use zone::{Zone, ZoneStats};

use crate::model::{CanonicalText, MonitoredDomain, RawRecordSet};
use tracing::debug;

/// Zone constants
pub mod constants {
    /// Default TTL if not specified (1 hour)
    pub const DEFAULT_TTL: u32 = 3600;

    /// Maximum accepted zone text (10MB)
    pub const MAX_ZONE_TEXT_SIZE: usize = 10 * 1024 * 1024;
}

/// Parse a fetched record set into a zone rooted at the domain apex and
/// serialize it as aligned canonical text.
///
/// Deterministic: the same records in any order and spacing give
/// byte-identical output. Any malformed record fails the whole call.
pub fn normalize(domain: &MonitoredDomain, raw: &RawRecordSet) -> Result<CanonicalText> {
    let zone = ZoneParser::new(&domain.origin()).parse(&raw.text())?;
    let text = AlignedBuilder::render(&zone);

    let stats = zone.stats();
    debug!(
        domain = %domain,
        records = stats.total_records,
        ns = stats.ns_records,
        soa_serial = ?zone.soa().and_then(|soa| soa.soa_serial()),
        "Normalized zone into {} bytes",
        text.len()
    );

    Ok(CanonicalText::new(text))
}
