use common::config::RetryConfig;
use common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::storage::{ObjectStorage, ObjectSummary};
use crate::utils::retry::retry_with_backoff;

/// True when `key` falls under at least one of the prefixes.
pub fn is_selected(key: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
}

/// Local path a key is staged at; mirrors the key's directory layout.
///
/// Every `/`-separated segment must be a plain name. Empty, `.` and `..`
/// segments are refused, so a staged path always sits under `staging_dir`
/// and maps back to exactly one key.
pub fn staging_path(staging_dir: &Path, key: &str) -> Result<PathBuf> {
    let mut path = staging_dir.to_path_buf();

    for segment in key.split('/') {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => path.push(name),
            _ => return Err(Error::InvalidInput(format!("unsafe object key: {key:?}"))),
        }
    }

    Ok(path)
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOutcome {
    /// Keys fetched into staging, whatever their type.
    pub downloaded: Vec<String>,
    /// Downloaded keys of the recognized file type, in listing order.
    pub eligible: Vec<String>,
    /// Selected keys that cannot be mapped into staging.
    pub skipped: Vec<String>,
}

pub struct Downloader<'a> {
    storage: &'a dyn ObjectStorage,
    staging_dir: &'a Path,
    file_extension: &'a str,
    retry: &'a RetryConfig,
}

impl<'a> Downloader<'a> {
    pub fn new(
        storage: &'a dyn ObjectStorage,
        staging_dir: &'a Path,
        file_extension: &'a str,
        retry: &'a RetryConfig,
    ) -> Self {
        Self {
            storage,
            staging_dir,
            file_extension,
            retry,
        }
    }

    /// Fetches every object under a valid prefix into staging. Any failed
    /// download aborts the run once its retries are spent.
    pub async fn download(
        &self,
        objects: &[ObjectSummary],
        prefixes: &[String],
    ) -> Result<DownloadOutcome> {
        let mut outcome = DownloadOutcome::default();

        for object in objects.iter().filter(|o| is_selected(&o.key, prefixes)) {
            let local_path = match staging_path(self.staging_dir, &object.key) {
                Ok(path) => path,
                Err(e) => {
                    warn!(key = %object.key, error = %e, "Skipping object");
                    outcome.skipped.push(object.key.clone());
                    continue;
                }
            };
            if let Some(parent) = local_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            retry_with_backoff(self.retry.max_retries, self.retry.base_delay_ms, || {
                self.storage.download_to(&object.key, &local_path)
            })
            .await?;

            debug!(key = %object.key, path = %local_path.display(), "Downloaded object");
            outcome.downloaded.push(object.key.clone());

            if object.key.ends_with(self.file_extension) {
                outcome.eligible.push(object.key.clone());
            }
        }

        info!(
            bucket = self.storage.bucket(),
            downloaded = outcome.downloaded.len(),
            eligible = outcome.eligible.len(),
            skipped = outcome.skipped.len(),
            "Download finished"
        );

        Ok(outcome)
    }
}
