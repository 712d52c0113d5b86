//! S3-compatible object store backed by the AWS SDK.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::provider::{ObjectMetadata, ObjectStore};
use hashsync_common::{Error, ObjectKey, Result, Secret};

/// Regions accepted by Yandex Object Storage.
const YANDEX_REGIONS: &[&str] = &["ru-central1", "ru-central1-a", "ru-central1-b", "ru-central1-c"];

/// Connection settings for an S3-compatible endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Settings {
    /// Custom endpoint URL; AWS is used when absent.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Signing region.
    pub region: String,
    /// Target bucket.
    pub bucket: String,
    /// Static access key id. When absent the default AWS credential chain
    /// is used.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Static secret access key, paired with `access_key`.
    #[serde(default)]
    pub secret_key: Option<Secret>,
    /// Address buckets as `endpoint/bucket` rather than `bucket.endpoint`.
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
}

fn default_force_path_style() -> bool {
    true
}

impl S3Settings {
    /// Check the settings for missing or inconsistent fields.
    ///
    /// # Errors
    /// - Empty region, bucket or endpoint
    /// - Only one of access key / secret key given
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(Error::Config("store.region must not be empty".to_string()));
        }
        if self.bucket.trim().is_empty() {
            return Err(Error::Config("store.bucket must not be empty".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            if endpoint.trim().is_empty() {
                return Err(Error::Config(
                    "store.endpoint must not be empty when set".to_string(),
                ));
            }
            if endpoint.contains("yandexcloud.net")
                && !YANDEX_REGIONS.contains(&self.region.as_str())
            {
                warn!(
                    "Yandex Cloud endpoint with region {}; expected ru-central1",
                    self.region
                );
            }
        }
        match (&self.access_key, &self.secret_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Ok(()),
            (None, None) => Ok(()),
            _ => Err(Error::Config(
                "store.access_key and store.secret_key must be set together".to_string(),
            )),
        }
    }
}

/// Object store talking to an S3-compatible service.
#[derive(Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from settings.
    ///
    /// No request is made; use [`ObjectStore::head_bucket`] to check
    /// connectivity.
    ///
    /// # Errors
    /// - Settings fail validation
    pub async fn connect(settings: &S3Settings) -> Result<Self> {
        settings.validate()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) = (&settings.access_key, &settings.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.expose().to_string(),
                None,
                None,
                "hashsync-config",
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        debug!(
            "S3 client ready for bucket {} (endpoint: {})",
            settings.bucket,
            settings.endpoint.as_deref().unwrap_or("aws")
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: settings.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_bucket(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                Error::Connectivity(format!(
                    "Bucket {} unreachable: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<Option<ObjectMetadata>> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await;

        match response {
            Ok(output) => Ok(Some(ObjectMetadata {
                key: key.clone(),
                size: output.content_length().and_then(|len| u64::try_from(len).ok()),
                modified: output
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
                etag: output.e_tag().map(str::to_string),
                user_metadata: output.metadata().cloned().unwrap_or_default(),
            })),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    return Ok(None);
                }
                Err(Error::Probe(format!(
                    "head_object {} failed: {}",
                    key,
                    DisplayErrorContext(&err)
                )))
            }
        }
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        source: &Path,
        metadata: HashMap<String, String>,
    ) -> Result<ObjectMetadata> {
        let size = tokio::fs::metadata(source).await?.len();
        let body = ByteStream::from_path(source).await.map_err(|e| {
            Error::Upload(format!("Failed to open {}: {}", source.display(), e))
        })?;

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(body)
            .set_metadata(Some(metadata.clone()))
            .send()
            .await
            .map_err(|e| {
                Error::Upload(format!(
                    "put_object {} failed: {}",
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(ObjectMetadata {
            key: key.clone(),
            size: Some(size),
            modified: Some(Utc::now()),
            etag: output.e_tag().map(str::to_string),
            user_metadata: metadata,
        })
    }
}
