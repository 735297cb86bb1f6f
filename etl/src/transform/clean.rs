use common::{Error, Result};
use std::path::Path;
use tracing::debug;

use crate::models::{CleanedRecord, RawRecord, SOURCE_COLUMNS, parse_timestamp};

pub const MIN_TOTAL: f64 = 0.0;
pub const MAX_TOTAL: f64 = 100.0;
pub const VOID_SENTINEL: &str = "void";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingTotal,
    VoidTotal,
    NonNumericTotal,
    OutOfRange,
    BadTimestamp,
}

/// Per-file account of what cleaning kept and why the rest was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub source: String,
    pub rows_read: usize,
    pub kept: usize,
    pub missing_total: usize,
    pub void_total: usize,
    pub non_numeric_total: usize,
    pub out_of_range: usize,
    pub bad_timestamp: usize,
}

impl CleanReport {
    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingTotal => self.missing_total += 1,
            DropReason::VoidTotal => self.void_total += 1,
            DropReason::NonNumericTotal => self.non_numeric_total += 1,
            DropReason::OutOfRange => self.out_of_range += 1,
            DropReason::BadTimestamp => self.bad_timestamp += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.rows_read - self.kept
    }
}

/// Truck id encoded in a source filename: the second `_`-separated segment
/// minus its leading character, e.g. `report_t7_2024.csv` gives 7.
pub fn extract_truck_id(key: &str) -> Result<u32> {
    let file_name = key.rsplit('/').next().unwrap_or(key);

    let segment = file_name
        .split('_')
        .nth(1)
        .ok_or_else(|| Error::MalformedFilename(file_name.to_string()))?;

    let mut chars = segment.chars();
    chars.next();
    let digits = chars.as_str();

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedFilename(file_name.to_string()));
    }

    digits
        .parse()
        .map_err(|_| Error::MalformedFilename(file_name.to_string()))
}

/// Applies the cleaning rules to one row, in order: missing total, void
/// sentinel, numeric coercion, the open (0, 100) bound, then timestamp.
pub fn clean_record(
    raw: &RawRecord,
    truck_id: u32,
) -> std::result::Result<CleanedRecord, DropReason> {
    let total = raw
        .total
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(DropReason::MissingTotal)?;

    if total.eq_ignore_ascii_case(VOID_SENTINEL) {
        return Err(DropReason::VoidTotal);
    }

    let total: f64 = total
        .parse()
        .ok()
        .filter(|v: &f64| !v.is_nan())
        .ok_or(DropReason::NonNumericTotal)?;

    if !(total > MIN_TOTAL && total < MAX_TOTAL) {
        return Err(DropReason::OutOfRange);
    }

    let timestamp = raw
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or(DropReason::BadTimestamp)?;

    Ok(CleanedRecord {
        timestamp,
        payment_method: raw.payment_method.clone().unwrap_or_default(),
        total,
        truck_id,
    })
}

/// Cleans a file's rows, preserving their order.
pub fn clean_records(
    source: &str,
    raws: &[RawRecord],
    truck_id: u32,
) -> (Vec<CleanedRecord>, CleanReport) {
    let mut report = CleanReport {
        source: source.to_string(),
        rows_read: raws.len(),
        ..Default::default()
    };

    let mut cleaned = Vec::with_capacity(raws.len());
    for raw in raws {
        match clean_record(raw, truck_id) {
            Ok(record) => cleaned.push(record),
            Err(reason) => report.record(reason),
        }
    }
    report.kept = cleaned.len();

    debug!(?report, "Cleaned source file");
    (cleaned, report)
}

/// Decodes a source CSV. The header must name every source column and every
/// row must have as many fields as the header.
pub fn read_source_file(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    for column in SOURCE_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(Error::InvalidInput(format!(
                "{} is missing column '{}'",
                path.display(),
                column
            )));
        }
    }

    let records = reader
        .deserialize::<RawRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}
