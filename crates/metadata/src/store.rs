//! Metadata store trait definition.

use crate::error::MetadataResult;
use async_trait::async_trait;
use larder_core::record::{FileRecord, ListFilter, NewFileRecord, RecordPatch};

/// File metadata store abstraction.
///
/// Records are structured rows, one per stored artifact; the store assigns
/// numeric ids and creation timestamps. Handles are shared read-mostly
/// across concurrent requests and must be safe for concurrent use.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    /// Create a record, returning it with the store-assigned id and
    /// creation timestamp.
    async fn create(&self, record: &NewFileRecord) -> MetadataResult<FileRecord>;

    /// Fetch one record by id.
    async fn get(&self, id: i64) -> MetadataResult<Option<FileRecord>>;

    /// Apply a partial update. Only fields present in the patch change.
    ///
    /// Returns `MetadataError::NotFound` for unknown ids.
    async fn update(&self, id: i64, patch: &RecordPatch) -> MetadataResult<FileRecord>;

    /// Delete one record. Deleting an unknown id is not an error.
    async fn delete(&self, id: i64) -> MetadataResult<()>;

    /// All records in a namespace matching the filter — originals and
    /// derivatives in one flat listing, ordered by id. Callers assemble
    /// originals with their version descriptors.
    async fn list(&self, namespace: &str, filter: &ListFilter) -> MetadataResult<Vec<FileRecord>>;

    /// Find a record in the namespace by content hash, for duplicate
    /// detection.
    async fn find_by_hash(&self, namespace: &str, md5: &str)
    -> MetadataResult<Option<FileRecord>>;

    /// Derivatives of one original, ordered by image width.
    async fn list_derivatives(&self, original_id: i64) -> MetadataResult<Vec<FileRecord>>;

    /// Run schema migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check store connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}
