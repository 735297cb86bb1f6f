use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use chrono::{DateTime, Utc};
use common::Result;
use common::config::StorageConfig;
use std::path::Path;

use super::{ObjectPage, ObjectStorage, ObjectSummary};

/// Throttling and server-side failures are worth retrying; any other
/// service response (access denied, bad request) is final.
fn service_error(status: u16, message: String) -> common::Error {
    if status == 429 || (500..600).contains(&status) {
        common::Error::Storage(message)
    } else {
        common::Error::StorageRejected(format!("HTTP {status}: {message}"))
    }
}

pub struct S3Storage {
    bucket: String,
    client: S3Client,
}

impl S3Storage {
    /// Builds a client from the storage settings. Static credentials and a
    /// custom endpoint are used when configured; otherwise the default AWS
    /// provider chain resolves them.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let client = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "static");

                let mut builder = aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .credentials_provider(credentials);

                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }

                S3Client::from_conf(builder.build())
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;

                let mut builder = aws_sdk_s3::config::Builder::from(&shared);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }

                S3Client::from_conf(builder.build())
            }
        };

        Ok(Self {
            bucket: config.bucket.clone(),
            client,
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(&self, continuation_token: Option<String>) -> Result<ObjectPage> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|e| match e {
            SdkError::ServiceError(err) => {
                let status = err.raw().status().as_u16();
                service_error(status, err.into_err().to_string())
            }
            _ => common::Error::Storage(e.to_string()),
        })?;

        let objects = response
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| {
                let last_modified = object
                    .last_modified
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));
                object.key.map(|key| ObjectSummary {
                    key,
                    size: object.size.unwrap_or(0),
                    last_modified,
                })
            })
            .collect();

        // S3 only hands out a token while the listing is truncated.
        let next_continuation_token = if response.is_truncated.unwrap_or(false) {
            response.next_continuation_token
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_continuation_token,
        })
    }

    async fn download_to(&self, key: &str, destination: &Path) -> Result<()> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) if err.err().is_no_such_key() => {
                    common::Error::ObjectNotFound(format!("{} in bucket {}", key, self.bucket))
                }
                SdkError::ServiceError(err) => {
                    let status = err.raw().status().as_u16();
                    service_error(status, err.into_err().to_string())
                }
                _ => common::Error::Storage(e.to_string()),
            })?;

        let data = response.body.collect().await?.into_bytes();
        tokio::fs::write(destination, &data).await?;

        Ok(())
    }
}
