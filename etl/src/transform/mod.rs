//! Transform stage: clean each staged file and fold them into one artifact.

mod clean;
mod merge;

pub use clean::{
    CleanReport, DropReason, MAX_TOTAL, MIN_TOTAL, VOID_SENTINEL, clean_record, clean_records,
    extract_truck_id, read_source_file,
};
pub use merge::{COMBINED_COLUMNS, Merger, combined_artifact_path, read_combined, write_combined};

use common::Result;
use common::config::PipelineConfig;

use crate::models::CombinedBatch;

/// Merges the eligible keys in key order into the run's combined artifact.
pub fn transform(pipeline: &PipelineConfig, eligible: &[String]) -> Result<CombinedBatch> {
    let mut keys = eligible.to_vec();
    keys.sort();

    let first = keys.first().ok_or(common::Error::EmptyBatch)?;
    let output =
        combined_artifact_path(&pipeline.staging_dir, first, &pipeline.combined_filename)?;

    Merger::new(&pipeline.staging_dir, &pipeline.consume).merge(&keys, &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::staging_path;
    use std::fs;

    const HEADER: &str = "timestamp,payment_method,total";

    #[test]
    fn test_keys_are_merged_in_key_order() {
        let staging = tempfile::tempdir().unwrap();
        let later = "trucks/2024-12/1/01/report_t2_b.csv";
        let earlier = "trucks/2024-12/1/00/report_t1_a.csv";
        for (key, total) in [(later, "20.00"), (earlier, "10.00")] {
            let path = staging_path(staging.path(), key).unwrap();
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, format!("{HEADER}\n2024-12-01 00:15:00,card,{total}\n")).unwrap();
        }
        let pipeline = PipelineConfig {
            staging_dir: staging.path().to_path_buf(),
            ..PipelineConfig::default()
        };

        let batch = transform(&pipeline, &[later.to_string(), earlier.to_string()]).unwrap();

        let trucks: Vec<_> = batch.records.iter().map(|r| r.truck_id).collect();
        assert_eq!(trucks, vec![1, 2]);
        assert_eq!(
            batch.artifact_path,
            staging.path().join("trucks/2024-12/1/00/combined_data.csv")
        );
    }
}
