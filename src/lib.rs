pub mod config;
pub mod diff;
pub mod dns;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod model;
pub mod notify;
pub mod resolver;
pub mod scan;
pub mod zone;

pub use config::WatchConfig;
pub use error::WatchError;
pub use model::{CanonicalText, MonitoredDomain, RawRecordSet};
pub use scan::{ScanOutcome, Scanner};
