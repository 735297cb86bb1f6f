//! Extract stage: work out the catch-up window, list the bucket and stage
//! every matching object locally.

mod download;
mod window;

pub use download::{DownloadOutcome, Downloader, is_selected, staging_path};
pub use window::{key_prefixes, window_partitions};

use chrono::{DateTime, Utc};
use common::Result;
use common::config::Settings;
use tracing::info;

use crate::storage::{ObjectStorage, list_all_objects};

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub prefixes: Vec<String>,
    pub listed: usize,
    pub downloaded: usize,
    /// Staged keys ready for the transform stage, in listing order.
    pub eligible: Vec<String>,
}

pub async fn extract(
    storage: &dyn ObjectStorage,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<Extraction> {
    let partitions = window_partitions(now, settings.pipeline.horizon_hours);
    let prefixes = key_prefixes(&settings.storage.key_root, &partitions);
    info!(?prefixes, "Computed catch-up window");

    let objects = list_all_objects(
        storage,
        settings.retry.max_retries,
        settings.retry.base_delay_ms,
    )
    .await?;

    let outcome = Downloader::new(
        storage,
        &settings.pipeline.staging_dir,
        &settings.pipeline.file_extension,
        &settings.retry,
    )
    .download(&objects, &prefixes)
    .await?;

    Ok(Extraction {
        prefixes,
        listed: objects.len(),
        downloaded: outcome.downloaded.len(),
        eligible: outcome.eligible,
    })
}
