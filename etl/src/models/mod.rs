mod batch;
mod record;
mod timestamp;

pub use batch::{CombinedBatch, FactRow};
pub use record::{CleanedRecord, RawRecord, SOURCE_COLUMNS};
pub use timestamp::{format_timestamp, parse_timestamp};
