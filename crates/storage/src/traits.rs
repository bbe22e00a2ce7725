//! Payload store trait definition.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of object keys for lazy listing operations.
pub type KeyStream = Pin<Box<dyn Stream<Item = StorageResult<String>> + Send>>;

/// Payload store abstraction.
///
/// Implementations store raw bytes under caller-computed keys (see
/// `larder_core::keys`) and confine side effects to the backing medium; no
/// in-memory caching is assumed. Handles are shared read-mostly across
/// concurrent requests and must be safe for concurrent use.
#[async_trait]
pub trait PayloadStore: Send + Sync + 'static {
    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    ///
    /// Returns `StorageError::NotFound` for unknown keys.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Store an object, replacing any previous content under the key.
    ///
    /// The content type is advisory; backends that serve payloads directly
    /// (S3 presigned URLs) record it, others ignore it.
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StorageResult<()>;

    /// Delete an object.
    ///
    /// Idempotent: deleting a missing key is not an error, so cleanup after
    /// a partial prior failure can always be retried.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Copy an object to a new key.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<()>;

    /// List keys under a string prefix as a lazy stream.
    ///
    /// The stream is finite and each call restarts from the beginning.
    async fn list_keys(&self, prefix: &str) -> StorageResult<KeyStream>;

    /// A URL under which the object can be downloaded (presigned where the
    /// backend requires authentication).
    async fn url(&self, key: &str) -> StorageResult<String>;

    /// Static identifier of the backend type, for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify backend connectivity.
    ///
    /// The default implementation returns `Ok(())`, suitable for backends
    /// without a meaningful liveness probe.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
