pub mod extract;
pub mod load;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod transform;
pub mod utils;
pub mod warehouse;

use chrono::Utc;
use common::Result;
use common::config::Settings;
use pipeline::{EtlPipeline, RunSummary};
use storage::S3Storage;
use warehouse::PgWarehouse;

/// Runs the complete ETL pipeline against S3 and the warehouse.
pub async fn run_etl_pipeline(config_path: &str) -> Result<RunSummary> {
    let settings = Settings::new(config_path)?;
    settings.validate()?;

    let storage = S3Storage::new(&settings.storage).await?;

    // Connect before anything is staged so an unreachable warehouse fails
    // the run while the source files are still untouched.
    let mut warehouse = PgWarehouse::connect(&settings.warehouse, &settings.retry).await?;

    let summary = EtlPipeline::new(&settings, &storage)
        .run(&mut warehouse, Utc::now())
        .await?;

    warehouse.close().await?;
    Ok(summary)
}
