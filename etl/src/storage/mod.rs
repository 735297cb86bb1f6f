pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Result;
use std::path::Path;
use tracing::{debug, info};

pub use s3::S3Storage;

/// One listed object and the metadata the listing reports for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectSummary {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            last_modified: None,
        }
    }
}

/// A single page of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn bucket(&self) -> &str;

    /// Fetches the page that starts at `continuation_token` (first page when `None`).
    async fn list_page(&self, continuation_token: Option<String>) -> Result<ObjectPage>;

    /// Copies one object to `destination`, overwriting it.
    async fn download_to(&self, key: &str, destination: &Path) -> Result<()>;
}

/// Lists every object in the bucket, following continuation tokens until
/// the provider reports there are no more pages.
pub async fn list_all_objects(
    storage: &dyn ObjectStorage,
    retries: u32,
    base_delay_ms: u64,
) -> Result<Vec<ObjectSummary>> {
    let mut objects = Vec::new();
    let mut continuation_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let token = continuation_token.clone();
        let page = crate::utils::retry::retry_with_backoff(retries, base_delay_ms, || {
            storage.list_page(token.clone())
        })
        .await?;

        pages += 1;
        debug!(page = pages, objects = page.objects.len(), "Fetched listing page");
        objects.extend(page.objects);

        continuation_token = page.next_continuation_token;
        if continuation_token.is_none() {
            break;
        }
    }

    info!(bucket = storage.bucket(), pages, objects = objects.len(), "Listed bucket");
    Ok(objects)
}
