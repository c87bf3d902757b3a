//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Tigris (Fly.io), and others.
//! Content types are stored as object metadata (`Content-Type`), so they
//! round-trip through [`put`](StorageBackend::put) and [`get`](StorageBackend::get)
//! without a sidecar.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.

use crate::{
    Record, StorageBackend,
    error::{ErrorKind, Result},
    validate_key,
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible storage backend.
///
/// Stores records in an S3 bucket, optionally under a key prefix. All keys
/// are relative to the configured prefix (if any).
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Base URL for public links; defaults to `{endpoint}/{bucket}`.
    public_base: String,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in display/logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.map(validate_key).transpose()?;
        let name = name.into();
        let bucket = bucket.into();
        let region = region.into();
        let credentials = Credentials::new(key_id, key_secret, None, None, "imgbatch-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.clone()))
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        let endpoint_base = match endpoint {
            Some(endpoint_url) => {
                config_builder = config_builder.endpoint_url(&endpoint_url);
                endpoint_url
            },
            None => format!("https://s3.{region}.amazonaws.com"),
        };
        let public_base = format!("{}/{bucket}", endpoint_base.trim_end_matches('/'));
        let client = Client::from_conf(config_builder.build());
        let rate_limiter = Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS));
        Ok(Self {
            name,
            client,
            bucket,
            prefix,
            public_base,
            rate_limiter,
        })
    }

    /// Serve public URLs from `base` (e.g. a CDN in front of the bucket).
    pub fn with_public_base(mut self, base: &Url) -> Self {
        self.public_base = base.as_str().trim_end_matches('/').to_string();
        self
    }

    /// Construct the full S3 key from a relative key.
    fn full_key(&self, key: &str) -> Result<String> {
        let validated = validate_key(key)?;
        Ok(join_prefix(self.prefix.as_deref(), &validated))
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("S3 rate limiter closed".to_string()))
    }
}

fn join_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        match self.client.head_object().bucket(&self.bucket).key(&full_key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => exn::bail!(ErrorKind::Network(DisplayErrorContext(&e).to_string())),
        }
    }

    async fn get(&self, key: &str) -> Result<Record> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        let output = match self.client.get_object().bucket(&self.bucket).key(&full_key).send().await {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                exn::bail!(ErrorKind::NotFound(key.to_string()))
            },
            Err(e) => exn::bail!(ErrorKind::Network(DisplayErrorContext(&e).to_string())),
        };
        let content_type = output.content_type().unwrap_or(crate::content_type::OCTET_STREAM).to_string();
        let body = output.body.collect().await.or_raise(|| ErrorKind::Network(format!("reading body of {key}")))?;
        Ok(Record { data: body.into_bytes().to_vec(), content_type })
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| ErrorKind::Network(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if !self.exists(key).await? {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| ErrorKind::Network(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> Result<String> {
        Ok(format!("{}/{}", self.public_base, self.full_key(key)?))
    }
}
