//! S3-compatible storage backend using the AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{KeyStream, PayloadStore};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::time::Duration;
use tracing::instrument;

const DEFAULT_REGION: &str = "us-east-1";

/// Copy-source values must be URL-encoded, but the `bucket/key` separator
/// and the characters our key scheme produces stay as-is.
const COPY_SOURCE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.');

/// S3-compatible payload store.
pub struct S3Backend {
    client: Client,
    bucket: String,
    url_expiry_secs: u64,
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// Without static credentials the ambient provider chain is used
    /// (environment, profile, instance metadata). An explicit endpoint and
    /// path-style addressing support S3 emulators such as MinIO.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
        url_expiry_secs: u64,
    ) -> StorageResult<Self> {
        let region = Region::new(region.unwrap_or_else(|| DEFAULT_REGION.to_string()));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let (Some(access_key_id), Some(secret_access_key)) =
            (access_key_id, secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "larder-static",
            ));
        }
        let shared = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(force_path_style);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            url_expiry_secs,
        })
    }

    fn boxed<E>(err: E) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::S3(Box::new(err))
    }
}

#[async_trait]
impl PayloadStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(Self::boxed(err))
                }
            }
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let data = output.body.collect().await.map_err(Self::boxed)?;
                Ok(data.into_bytes())
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    Err(StorageError::NotFound(key.to_string()))
                } else {
                    Err(Self::boxed(err))
                }
            }
        }
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StorageResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(data.len() as i64)
            .body(ByteStream::from(data));
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        request.send().await.map_err(Self::boxed)?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        // S3 delete succeeds for missing keys, which matches the idempotent
        // contract directly.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::boxed)?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        let source = format!(
            "{}/{}",
            self.bucket,
            utf8_percent_encode(from, COPY_SOURCE_ENCODE_SET)
        );
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(to)
            .send()
            .await
            .map_err(Self::boxed)?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list_keys(&self, prefix: &str) -> StorageResult<KeyStream> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let stream = async_stream::try_stream! {
            while let Some(page) = pages.next().await {
                let page = page.map_err(Self::boxed)?;
                for object in page.contents() {
                    if let Some(key) = object.key() {
                        yield key.to_string();
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn url(&self, key: &str) -> StorageResult<String> {
        // Buckets are private; hand out a presigned GET instead of a public
        // object URL.
        let config = PresigningConfig::expires_in(Duration::from_secs(self.url_expiry_secs))
            .map_err(|e| StorageError::Config(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(Self::boxed)?;
        Ok(presigned.uri().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(Self::boxed)?;
        Ok(())
    }
}
