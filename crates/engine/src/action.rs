//! The base files workflow: upload, list, update and delete against the two
//! stores.
//!
//! [`FilesAction`] carries the workflow as default methods so the image
//! action can reuse everything except the storing step it replaces.
//! Per-item failures inside a batch are converted into failure outcomes;
//! nothing a single file does can abort the files after it.

use crate::error::{EngineError, EngineResult};
use crate::orchestrator::Orchestrator;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use larder_core::hash::Md5Hash;
use larder_core::mime;
use larder_core::record::{FileRecord, ListFilter, NewFileRecord, RecordPatch, VersionDescriptor};
use larder_metadata::MetadataStore;
use larder_storage::PayloadStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One file of an upload batch.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    /// Client-provided file name, including extension.
    pub file_name: String,
    /// Client-provided content type; used when the extension is unknown.
    pub mime_type: String,
    pub description: Option<String>,
    pub payload: Bytes,
}

impl IncomingFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            description: None,
            payload: payload.into(),
        }
    }
}

/// Failure details for one file of a batch.
#[derive(Clone, Debug, Serialize)]
pub struct UploadFailure {
    pub upload_failed: bool,
    pub error_type: String,
    pub error_msg: String,
    pub file_name: String,
    pub mime_type: String,
}

impl UploadFailure {
    fn from_error(file_name: String, mime_type: String, err: &EngineError) -> Self {
        Self {
            upload_failed: true,
            error_type: err.error_type().to_string(),
            error_msg: format!("\"{file_name}\" was not stored. {err}"),
            file_name,
            mime_type,
        }
    }
}

/// Outcome of one file of a batch: stored metadata or failure details.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum UploadOutcome {
    Stored(Box<FileRecord>),
    Failed(UploadFailure),
}

impl UploadOutcome {
    pub fn record(&self) -> Option<&FileRecord> {
        match self {
            Self::Stored(record) => Some(record.as_ref()),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        match self {
            Self::Stored(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// Batch response: one outcome per uploaded file, in input order.
#[derive(Debug, Serialize)]
pub struct UploadBatch {
    pub items: Vec<UploadOutcome>,
}

/// The upload/list/update/delete workflow for one namespace.
///
/// Implementations provide the storing step; the surrounding workflow is
/// shared through default methods.
#[async_trait]
pub trait FilesAction: Send + Sync {
    fn orchestrator(&self) -> &Orchestrator;

    /// Whether a returned original record carries a download href. The
    /// image action omits it when original payloads are not stored.
    fn include_original_href(&self, _record: &FileRecord) -> bool {
        true
    }

    /// Store one uploaded file and return its metadata.
    async fn store_original_file(&self, file: IncomingFile) -> EngineResult<FileRecord>;

    /// Store a batch of files, isolating failures per item.
    ///
    /// Files are independent units and run concurrently on a bounded pool;
    /// outcomes are still reported in input order.
    async fn upload_batch(&self, files: Vec<IncomingFile>) -> UploadBatch {
        let parallelism = self.orchestrator().limits().max_parallel_uploads.max(1);
        let items = stream::iter(files.into_iter().map(|file| {
            let file_name = file.file_name.clone();
            let mime_type = file.mime_type.clone();
            async move {
                match self.store_original_file(file).await {
                    Ok(record) => UploadOutcome::Stored(Box::new(record)),
                    Err(err) => {
                        tracing::warn!(file_name = %file_name, error = %err, "upload failed");
                        UploadOutcome::Failed(UploadFailure::from_error(file_name, mime_type, &err))
                    }
                }
            }
        }))
        .buffered(parallelism)
        .collect()
        .await;
        UploadBatch { items }
    }

    /// Original records in the namespace, each carrying descriptors of its
    /// derived versions. Pure read.
    async fn list_originals(&self, filter: &ListFilter) -> EngineResult<Vec<FileRecord>> {
        let orchestrator = self.orchestrator();
        let universe = orchestrator
            .metadata()
            .list(orchestrator.namespace(), filter)
            .await?;

        let mut originals: Vec<FileRecord> = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();
        let mut derivatives: Vec<FileRecord> = Vec::new();
        for record in universe {
            if record.is_original() {
                index.insert(record.id, originals.len());
                originals.push(record);
            } else {
                derivatives.push(record);
            }
        }

        derivatives.sort_by_key(|d| d.image_width.unwrap_or(0));
        for derivative in derivatives {
            let Some(original_id) = derivative.original_id else {
                continue;
            };
            let Some(&position) = index.get(&original_id) else {
                continue;
            };
            let key = orchestrator.key_for(&derivative);
            let href = Some(orchestrator.payload().url(&key).await?);
            originals[position].versions.push(VersionDescriptor {
                id: derivative.id,
                version: derivative.version,
                href,
            });
        }

        for original in &mut originals {
            original.href = if self.include_original_href(original) {
                Some(orchestrator.url_for(original).await?)
            } else {
                None
            };
        }
        Ok(originals)
    }

    /// Replace caller-updatable metadata of one record.
    ///
    /// Payload bytes and the storage key are immutable after creation;
    /// identity-bearing fields are rejected when the patch is built.
    async fn update_metadata(&self, id: i64, patch: &RecordPatch) -> EngineResult<FileRecord> {
        let orchestrator = self.orchestrator();
        let record = orchestrator.metadata().update(id, patch).await?;
        let include_href = self.include_original_href(&record);
        finish_record(orchestrator, record, include_href).await
    }

    /// Delete one record and its payload; for an original, all derived
    /// versions are destroyed with it.
    async fn delete_file(&self, id: i64) -> EngineResult<()> {
        let orchestrator = self.orchestrator();
        let record = orchestrator
            .metadata()
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("file #{id}")))?;

        let mut targets = if record.is_original() {
            orchestrator.metadata().list_derivatives(id).await?
        } else {
            Vec::new()
        };
        targets.push(record);

        for target in targets {
            // Payload deletes are idempotent, so a re-run after a partial
            // failure converges instead of erroring on the missing keys.
            let key = orchestrator.key_for(&target);
            orchestrator.payload().delete(&key).await?;
            orchestrator.metadata().delete(target.id).await?;
            tracing::debug!(id = target.id, version = %target.version, "deleted stored artifact");
        }
        Ok(())
    }
}

/// The plain files workflow: any payload, no derived versions.
pub struct BaseFilesAction {
    orchestrator: Arc<Orchestrator>,
}

impl BaseFilesAction {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Store an already validated upload as a plain file.
    pub(crate) async fn store_prepared(
        &self,
        prepared: PreparedUpload,
    ) -> EngineResult<FileRecord> {
        let orchestrator = self.orchestrator.as_ref();
        if let Some(existing) = find_duplicate(orchestrator, &prepared.md5).await? {
            return finish_record(orchestrator, existing, true).await;
        }

        let mut record = NewFileRecord::original(
            orchestrator.namespace(),
            &prepared.md5,
            &prepared.file_name,
            prepared.length,
            &prepared.mime_type,
        );
        record.description = prepared.description.clone();

        let record = persist_record(orchestrator, record, Some(prepared.payload)).await?;
        finish_record(orchestrator, record, true).await
    }
}

#[async_trait]
impl FilesAction for BaseFilesAction {
    fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    async fn store_original_file(&self, file: IncomingFile) -> EngineResult<FileRecord> {
        let prepared = prepare_upload(&self.orchestrator, file)?;
        self.store_prepared(prepared).await
    }
}

/// A validated upload: limits checked, MIME type settled, hash computed.
pub(crate) struct PreparedUpload {
    pub file_name: String,
    pub mime_type: String,
    pub description: Option<String>,
    pub md5: String,
    pub length: i64,
    pub payload: Bytes,
}

/// Validate an upload against the instance limits and compute its
/// best-effort attributes.
pub(crate) fn prepare_upload(
    orchestrator: &Orchestrator,
    file: IncomingFile,
) -> EngineResult<PreparedUpload> {
    let IncomingFile {
        file_name,
        mime_type,
        description,
        payload,
    } = file;

    if file_name.is_empty() {
        return Err(EngineError::Validation(
            "The upload is missing a file name.".to_string(),
        ));
    }

    // The extension is more reliable than the browser-provided type; keep
    // the latter only when the extension is unknown.
    let mime_type = mime::guess_mime_type(&file_name)
        .map(str::to_string)
        .unwrap_or(mime_type);
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime_type
    };

    let limits = orchestrator.limits();
    let length = payload.len() as u64;
    if limits.max_file_size > 0 && length > limits.max_file_size {
        return Err(EngineError::Validation(format!(
            "The file is {} KB long and the maximum is {} KB.",
            length / 1024,
            limits.max_file_size / 1024
        )));
    }
    if length == 0 && !limits.allow_empty_files {
        return Err(EngineError::Validation("The file is empty.".to_string()));
    }

    let md5 = Md5Hash::compute(&payload).to_hex();
    Ok(PreparedUpload {
        file_name,
        mime_type,
        description,
        md5,
        length: length as i64,
        payload,
    })
}

/// With duplicate detection enabled, resolve an upload to the record that
/// already carries its content hash.
pub(crate) async fn find_duplicate(
    orchestrator: &Orchestrator,
    md5: &str,
) -> EngineResult<Option<FileRecord>> {
    if !orchestrator.limits().dedup_uploads {
        return Ok(None);
    }
    let existing = orchestrator
        .metadata()
        .find_by_hash(orchestrator.namespace(), md5)
        .await?;
    if let Some(existing) = &existing {
        tracing::debug!(
            md5 = %md5,
            id = existing.id,
            "duplicate upload resolved to existing record"
        );
    }
    Ok(existing)
}

/// Create the metadata record, then write the payload under its key.
///
/// A payload-write failure deletes the record again (best effort) so no
/// row points at bytes that were never stored; the failure still surfaces
/// to the caller as that item's outcome.
pub(crate) async fn persist_record(
    orchestrator: &Orchestrator,
    record: NewFileRecord,
    payload: Option<Bytes>,
) -> EngineResult<FileRecord> {
    let record = orchestrator.metadata().create(&record).await?;
    if let Some(payload) = payload {
        let key = orchestrator.key_for(&record);
        if let Err(err) = orchestrator
            .payload()
            .put(&key, payload, Some(&record.mime_type))
            .await
        {
            if let Err(cleanup) = orchestrator.metadata().delete(record.id).await {
                tracing::warn!(
                    id = record.id,
                    error = %cleanup,
                    "compensating metadata delete failed, orphan record left behind"
                );
            }
            return Err(err.into());
        }
    }
    Ok(record)
}

/// Fill in version descriptors and the download href of a record about to
/// be returned to the caller.
pub(crate) async fn finish_record(
    orchestrator: &Orchestrator,
    mut record: FileRecord,
    include_href: bool,
) -> EngineResult<FileRecord> {
    if record.is_original() {
        record.versions = version_descriptors(orchestrator, record.id).await?;
    }
    record.href = if include_href {
        Some(orchestrator.url_for(&record).await?)
    } else {
        None
    };
    Ok(record)
}

/// Descriptors of one original's derivatives, ordered by image width.
pub(crate) async fn version_descriptors(
    orchestrator: &Orchestrator,
    original_id: i64,
) -> EngineResult<Vec<VersionDescriptor>> {
    let derivatives = orchestrator.metadata().list_derivatives(original_id).await?;
    let mut descriptors = Vec::with_capacity(derivatives.len());
    for derivative in derivatives {
        let key = orchestrator.key_for(&derivative);
        descriptors.push(VersionDescriptor {
            id: derivative.id,
            version: derivative.version,
            href: Some(orchestrator.payload().url(&key).await?),
        });
    }
    Ok(descriptors)
}
