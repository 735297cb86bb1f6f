use chrono::NaiveDateTime;
use std::path::PathBuf;

use super::CleanedRecord;
use crate::transform::CleanReport;

/// Everything one run merged: the rows, where they came from and where they
/// were written.
#[derive(Debug, Clone)]
pub struct CombinedBatch {
    pub records: Vec<CleanedRecord>,
    pub consumed: Vec<PathBuf>,
    pub artifact_path: PathBuf,
    pub reports: Vec<CleanReport>,
}

impl CombinedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A row of the fact table. Append-only once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub truck_id: i64,
    pub payment_method_id: i64,
    pub total: f64,
    pub at: NaiveDateTime,
}
