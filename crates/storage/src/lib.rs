//! Payload storage abstraction and backends for Larder.
//!
//! This crate provides:
//! - The [`PayloadStore`] capability contract: raw bytes keyed by
//!   resolver-computed keys, with idempotent deletes and lazy listing
//! - Backends: local filesystem and S3-compatible object storage

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use traits::{KeyStream, PayloadStore};

use larder_core::config::PayloadBackendConfig;
use std::sync::Arc;

/// Create a payload store from configuration.
pub async fn from_config(config: &PayloadBackendConfig) -> StorageResult<Arc<dyn PayloadStore>> {
    config
        .validate()
        .map_err(|e| StorageError::Config(e.to_string()))?;

    match config {
        PayloadBackendConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        PayloadBackendConfig::S3 {
            bucket,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
            force_path_style,
            url_expiry_secs,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
                *url_expiry_secs,
            )
            .await?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[tokio::test]
    async fn from_config_filesystem_ok() {
        let temp = tempdir().unwrap();
        let config = PayloadBackendConfig::Filesystem {
            path: temp.path().join("payloads"),
        };

        let store = from_config(&config).await.unwrap();
        store
            .put("greeting.txt", Bytes::from_static(b"hi"), None)
            .await
            .unwrap();
        assert!(store.exists("greeting.txt").await.unwrap());
    }

    #[tokio::test]
    async fn from_config_s3_ok() {
        let config = PayloadBackendConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: Some("http://minio:9000".to_string()),
            region: Some("us-east-1".to_string()),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
            url_expiry_secs: 3600,
        };

        let store = from_config(&config).await.unwrap();
        drop(store);
    }

    #[tokio::test]
    async fn from_config_rejects_partial_credentials() {
        let config = PayloadBackendConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: None,
            region: None,
            access_key_id: Some("access".to_string()),
            secret_access_key: None,
            force_path_style: false,
            url_expiry_secs: 3600,
        };

        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(StorageError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
