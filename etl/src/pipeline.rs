use chrono::{DateTime, Utc};
use common::Result;
use common::config::Settings;
use std::path::PathBuf;
use tracing::{Instrument, info, info_span};

use crate::extract::extract;
use crate::load::{LoadReport, load_artifact};
use crate::storage::ObjectStorage;
use crate::transform::transform;
use crate::warehouse::Warehouse;

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub prefixes: Vec<String>,
    pub listed: usize,
    pub downloaded: usize,
    pub eligible: usize,
    pub rows_merged: usize,
    pub artifact_path: Option<PathBuf>,
    pub load: Option<LoadReport>,
}

/// Runs extract, transform and load once, strictly in that order.
pub struct EtlPipeline<'a> {
    settings: &'a Settings,
    storage: &'a dyn ObjectStorage,
}

impl<'a> EtlPipeline<'a> {
    pub fn new(settings: &'a Settings, storage: &'a dyn ObjectStorage) -> Self {
        Self { settings, storage }
    }

    pub async fn run<W: Warehouse + ?Sized>(
        &self,
        warehouse: &mut W,
        now: DateTime<Utc>,
    ) -> Result<RunSummary> {
        let extraction = extract(self.storage, self.settings, now)
            .instrument(info_span!("extract", bucket = self.storage.bucket()))
            .await?;

        let mut summary = RunSummary {
            prefixes: extraction.prefixes,
            listed: extraction.listed,
            downloaded: extraction.downloaded,
            eligible: extraction.eligible.len(),
            ..Default::default()
        };

        if extraction.eligible.is_empty() {
            info!("No new transaction files in the catch-up window");
            return Ok(summary);
        }

        let batch = info_span!("transform").in_scope(|| {
            transform(&self.settings.pipeline, &extraction.eligible)
        })?;
        summary.rows_merged = batch.len();
        summary.artifact_path = Some(batch.artifact_path.clone());

        let report = load_artifact(warehouse, &batch.artifact_path, &self.settings.retry)
            .instrument(info_span!("load"))
            .await?;
        summary.load = Some(report);

        info!(
            eligible = summary.eligible,
            rows_merged = summary.rows_merged,
            "ETL run finished"
        );
        Ok(summary)
    }
}
