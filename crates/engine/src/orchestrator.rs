//! The orchestrator ties one namespace's configured components together.

use crate::action::{BaseFilesAction, FilesAction};
use crate::codec::{ImageCodec, RustCodec};
use crate::error::{EngineError, EngineResult};
use crate::image_action::ImageAction;
use crate::migrate::{self, MigrationReport};
use larder_core::config::{ImageConfig, InstanceConfig, UploadLimits};
use larder_core::keys::{KeyResolver, MiddlePathFn};
use larder_core::record::FileRecord;
use larder_metadata::MetadataStore;
use larder_storage::PayloadStore;
use std::sync::Arc;

/// Long-lived coordinator for one storage instance.
///
/// Holds the payload store, the metadata store, the key resolver and the
/// configured limits for a single namespace. The orchestrator keeps no
/// per-request state and is shared read-mostly across concurrent requests;
/// several instances may share one physical bucket or table by using
/// disjoint namespaces or middle paths.
pub struct Orchestrator {
    name: String,
    namespace: String,
    resolver: KeyResolver,
    payload: Arc<dyn PayloadStore>,
    metadata: Arc<dyn MetadataStore>,
    limits: UploadLimits,
    image: Option<ImageConfig>,
}

impl Orchestrator {
    /// Construct the configured backends and return a ready orchestrator.
    pub async fn from_config(config: InstanceConfig) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let payload = larder_storage::from_config(&config.payload).await?;
        let metadata = larder_metadata::from_config(&config.metadata).await?;
        let resolver = match &config.middle_path_prefix {
            Some(prefix) => KeyResolver::with_prefix(prefix),
            None => KeyResolver::new(),
        };

        tracing::info!(
            name = %config.name,
            namespace = %config.namespace,
            payload_backend = payload.backend_name(),
            "storage instance ready"
        );

        Ok(Self {
            name: config.name,
            namespace: config.namespace,
            resolver,
            payload,
            metadata,
            limits: config.limits,
            image: config.image,
        })
    }

    /// Assemble an orchestrator from already constructed parts. Useful for
    /// embedding applications that build their own backends, and for tests.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        payload: Arc<dyn PayloadStore>,
        metadata: Arc<dyn MetadataStore>,
        limits: UploadLimits,
        image: Option<ImageConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            resolver: KeyResolver::new(),
            payload,
            metadata,
            limits,
            image,
        }
    }

    /// Replace the middle-path function of the key resolver.
    pub fn with_middle_path(mut self, middle_path: MiddlePathFn) -> Self {
        self.resolver = KeyResolver::with_middle_path(middle_path);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    pub fn payload(&self) -> &dyn PayloadStore {
        self.payload.as_ref()
    }

    pub fn metadata(&self) -> &dyn MetadataStore {
        self.metadata.as_ref()
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn image_config(&self) -> Option<&ImageConfig> {
        self.image.as_ref()
    }

    /// Storage key of one record's payload.
    pub fn key_for(&self, record: &FileRecord) -> String {
        self.resolver
            .resolve(&record.namespace, record.id, &record.version)
    }

    /// Download URL of one record's payload.
    pub async fn url_for(&self, record: &FileRecord) -> EngineResult<String> {
        Ok(self.payload.url(&self.key_for(record)).await?)
    }

    /// The action configured for this instance: the image workflow when an
    /// image policy is present, the plain files workflow otherwise.
    pub fn action(self: Arc<Self>) -> Box<dyn FilesAction> {
        let codec = Arc::new(RustCodec::new());
        self.action_with_codec(codec)
    }

    /// Like [`Self::action`], with a caller-supplied image codec.
    pub fn action_with_codec(self: Arc<Self>, codec: Arc<dyn ImageCodec>) -> Box<dyn FilesAction> {
        match self.image.clone() {
            Some(policy) => Box::new(ImageAction::new(self, codec, policy)),
            None => Box::new(BaseFilesAction::new(self)),
        }
    }

    /// Rewrite this namespace's payload keys from the retired dash scheme
    /// to the current slash scheme.
    ///
    /// Keys already present under the new scheme are skipped, so the
    /// routine is idempotent and safe to re-run after a partial failure.
    /// Stored records reference payloads only through the resolver, so no
    /// metadata rewrite is involved. With `remove_legacy` the old keys are
    /// deleted once their copy exists.
    pub async fn migrate_legacy_keys(
        &self,
        remove_legacy: bool,
    ) -> EngineResult<MigrationReport> {
        migrate::migrate_legacy_keys(self, remove_legacy).await
    }

    /// Verify both backends are reachable.
    pub async fn health_check(&self) -> EngineResult<()> {
        self.payload.health_check().await?;
        self.metadata.health_check().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("payload_backend", &self.payload.backend_name())
            .finish_non_exhaustive()
    }
}
