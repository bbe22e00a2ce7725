//! The image workflow: format normalization, orientation correction and
//! the derived version cascade.

use crate::action::{
    self, BaseFilesAction, FilesAction, IncomingFile, PreparedUpload, persist_record,
};
use crate::codec::{DecodedImage, ImageCodec};
use crate::error::{EngineError, EngineResult};
use crate::orchestrator::Orchestrator;
use async_trait::async_trait;
use image::DynamicImage;
use larder_core::config::{ImageConfig, OutputFormat};
use larder_core::hash::Md5Hash;
use larder_core::mime;
use larder_core::record::{FileRecord, NewFileRecord, VersionDescriptor};
use std::sync::Arc;

/// The files workflow for image namespaces.
///
/// Composes the base workflow with the version pipeline: non-image uploads
/// (and undecodable payloads) fall through to the plain-file path unless
/// the policy mandates images.
pub struct ImageAction {
    base: BaseFilesAction,
    codec: Arc<dyn ImageCodec>,
    policy: ImageConfig,
}

impl ImageAction {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        codec: Arc<dyn ImageCodec>,
        policy: ImageConfig,
    ) -> Self {
        Self {
            base: BaseFilesAction::new(orchestrator),
            codec,
            policy,
        }
    }

    /// Target encoding for one decoded upload.
    fn output_format(&self, decoded: &DecodedImage) -> OutputFormat {
        if self.policy.preserve_format {
            // Sources we cannot re-emit (e.g. GIF) fall back to the
            // configured target.
            decoded.format.unwrap_or(self.policy.format)
        } else {
            self.policy.format
        }
    }

    /// Run the version pipeline for one decoded upload.
    async fn store_image(
        &self,
        prepared: PreparedUpload,
        mut decoded: DecodedImage,
    ) -> EngineResult<FileRecord> {
        let orchestrator = self.orchestrator();

        // Step 1: correct the orientation so every stored payload is
        // upright. Re-encoding from pixels below means no orientation tag
        // survives in the output.
        self.codec.orient(&mut decoded);
        let format = self.output_format(&decoded);
        let upright = decoded.image;
        let (width, height) = (upright.width(), upright.height());

        // Step 2: normalize the full-resolution original to the target
        // encoding. The content hash identifies the stored bytes.
        let encoded = self
            .codec
            .encode(&upright, format, self.policy.quality)
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        let md5 = Md5Hash::compute(&encoded).to_hex();

        if let Some(existing) = action::find_duplicate(orchestrator, &md5).await? {
            let include_href = self.include_original_href(&existing);
            return action::finish_record(orchestrator, existing, include_href).await;
        }

        // Step 3: store the original. The metadata is always kept so
        // repeated uploads can be recognized; the payload only when the
        // policy says so.
        let mut record = NewFileRecord::original(
            orchestrator.namespace(),
            &md5,
            &prepared.file_name,
            encoded.len() as i64,
            format.mime_type(),
        );
        record.description = prepared.description.clone();
        record.image_format = Some(format.as_str().to_string());
        record.image_width = Some(width as i64);
        record.image_height = Some(height as i64);

        let payload = self.policy.store_original.then(|| encoded.clone());
        let mut record = persist_record(orchestrator, record, payload).await?;

        // Step 4: the descending size cascade. Only sizes strictly smaller
        // than the upload's longer edge are produced — never upscale. One
        // size failing does not invalidate the sizes already stored.
        let longer_edge = width.max(height);
        let mut versions: Vec<(i64, VersionDescriptor)> = Vec::new();
        for size in self.policy.cascade() {
            if size >= longer_edge {
                continue;
            }
            match self.store_version(&upright, &record, format, size).await {
                Ok(entry) => versions.push(entry),
                Err(err) => {
                    tracing::warn!(
                        id = record.id,
                        size,
                        error = %err,
                        "failed to generate image version"
                    );
                }
            }
        }
        versions.sort_by_key(|(width, _)| *width);
        record.versions = versions.into_iter().map(|(_, descriptor)| descriptor).collect();

        record.href = if self.policy.store_original {
            Some(orchestrator.url_for(&record).await?)
        } else {
            None
        };
        Ok(record)
    }

    /// Resize, encode and store one derived version.
    async fn store_version(
        &self,
        upright: &DynamicImage,
        original: &FileRecord,
        format: OutputFormat,
        size: u32,
    ) -> EngineResult<(i64, VersionDescriptor)> {
        let orchestrator = self.orchestrator();
        let resized = self.codec.resize(upright, size);
        let encoded = self
            .codec
            .encode(&resized, format, self.policy.quality)
            .map_err(|e| EngineError::Decode(e.to_string()))?;

        let width = resized.width() as i64;
        let mut record = NewFileRecord::original(
            orchestrator.namespace(),
            Md5Hash::compute(&encoded).to_hex(),
            &original.file_name,
            encoded.len() as i64,
            format.mime_type(),
        );
        record.version = size.to_string();
        record.original_id = Some(original.id);
        record.image_format = Some(format.as_str().to_string());
        record.image_width = Some(width);
        record.image_height = Some(resized.height() as i64);

        let record = persist_record(orchestrator, record, Some(encoded)).await?;
        let href = Some(orchestrator.url_for(&record).await?);
        Ok((
            width,
            VersionDescriptor {
                id: record.id,
                version: record.version,
                href,
            },
        ))
    }
}

#[async_trait]
impl FilesAction for ImageAction {
    fn orchestrator(&self) -> &Orchestrator {
        self.base.orchestrator()
    }

    fn include_original_href(&self, record: &FileRecord) -> bool {
        // Without a stored original payload there is nothing to link to.
        !(record.image_width.is_some() && !self.policy.store_original)
    }

    async fn store_original_file(&self, file: IncomingFile) -> EngineResult<FileRecord> {
        let prepared = action::prepare_upload(self.orchestrator(), file)?;

        if !mime::is_image(&prepared.mime_type) {
            if self.policy.upload_must_be_image {
                return Err(EngineError::Validation(format!(
                    "The file name \"{}\" lacks a supported image extension, \
                     so it was not stored.",
                    prepared.file_name
                )));
            }
            return self.base.store_prepared(prepared).await;
        }

        match self.codec.decode(&prepared.payload) {
            Ok(decoded) => self.store_image(prepared, decoded).await,
            Err(err) => {
                if self.policy.upload_must_be_image {
                    return Err(EngineError::Validation(format!(
                        "Unable to store the image \"{}\" because the server \
                         is unable to identify the image format.",
                        prepared.file_name
                    )));
                }
                // A corrupt or unsupported image degrades to the plain-file
                // workflow; the record just carries no image attributes.
                tracing::debug!(
                    file_name = %prepared.file_name,
                    error = %err,
                    "payload did not decode as an image, storing as plain file"
                );
                self.base.store_prepared(prepared).await
            }
        }
    }
}
