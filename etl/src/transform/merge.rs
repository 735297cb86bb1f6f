use common::config::ConsumePolicy;
use common::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::clean::{CleanReport, clean_records, extract_truck_id, read_source_file};
use crate::extract::staging_path;
use crate::models::{CleanedRecord, CombinedBatch};

pub const COMBINED_COLUMNS: [&str; 4] = ["timestamp", "payment_method", "total", "truck_id"];

/// Where the combined artifact for a run goes: next to the first staged
/// file, under a fixed filename.
pub fn combined_artifact_path(
    staging_dir: &Path,
    first_key: &str,
    filename: &str,
) -> Result<PathBuf> {
    let file = staging_path(staging_dir, first_key)?;
    Ok(file
        .parent()
        .map(|dir| dir.join(filename))
        .unwrap_or_else(|| staging_dir.join(filename)))
}

pub struct Merger<'a> {
    staging_dir: &'a Path,
    consume: &'a ConsumePolicy,
}

impl<'a> Merger<'a> {
    pub fn new(staging_dir: &'a Path, consume: &'a ConsumePolicy) -> Self {
        Self {
            staging_dir,
            consume,
        }
    }

    /// Cleans every staged file in the given order, consumes each one as soon
    /// as it has been processed, and writes the concatenation to `output`.
    ///
    /// A file that fails to decode aborts the merge with its own error, but it
    /// and every file before it have already been consumed.
    pub fn merge(&self, keys: &[String], output: &Path) -> Result<CombinedBatch> {
        if keys.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let mut records: Vec<CleanedRecord> = Vec::new();
        let mut consumed = Vec::with_capacity(keys.len());
        let mut reports = Vec::with_capacity(keys.len());

        for key in keys {
            let path = staging_path(self.staging_dir, key)?;

            let cleaned = extract_truck_id(key).and_then(|truck_id| {
                let raws = read_source_file(&path)?;
                Ok(clean_records(key, &raws, truck_id))
            });

            let consumption = self.consume_file(key, &path);
            let (rows, report) = match cleaned {
                Ok(cleaned) => {
                    consumption?;
                    cleaned
                }
                Err(e) => {
                    if let Err(consume_err) = consumption {
                        warn!(key = %key, error = %consume_err, "Could not consume staged file");
                    }
                    return Err(e);
                }
            };
            consumed.push(path);

            log_report(&report);
            records.extend(rows);
            reports.push(report);
        }

        write_combined(output, &records)?;
        info!(
            files = consumed.len(),
            rows = records.len(),
            artifact = %output.display(),
            "Combined transaction data saved"
        );

        Ok(CombinedBatch {
            records,
            consumed,
            artifact_path: output.to_path_buf(),
            reports,
        })
    }

    fn consume_file(&self, key: &str, path: &Path) -> Result<()> {
        match self.consume {
            ConsumePolicy::Delete => fs::remove_file(path)?,
            ConsumePolicy::Archive { archive_dir } => {
                let target = staging_path(archive_dir, key)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                // rename cannot cross filesystems; fall back to copy + remove.
                if fs::rename(path, &target).is_err() {
                    fs::copy(path, &target)?;
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

fn log_report(report: &CleanReport) {
    if report.dropped() > 0 {
        warn!(
            source = %report.source,
            rows_read = report.rows_read,
            kept = report.kept,
            missing_total = report.missing_total,
            void_total = report.void_total,
            non_numeric_total = report.non_numeric_total,
            out_of_range = report.out_of_range,
            bad_timestamp = report.bad_timestamp,
            "Dropped rows while cleaning"
        );
    } else {
        info!(source = %report.source, rows = report.kept, "Cleaned source file");
    }
}

/// Writes the artifact with a header row, even when there are no records.
pub fn write_combined(output: &Path, records: &[CleanedRecord]) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output)?;
    writer.write_record(COMBINED_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Reads a combined artifact back. The header row is skipped.
pub fn read_combined(path: &Path) -> Result<Vec<CleanedRecord>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let records = reader
        .deserialize::<CleanedRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}
