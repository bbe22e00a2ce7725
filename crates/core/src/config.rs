//! Configuration types shared across crates.
//!
//! One [`InstanceConfig`] describes one storage instance: the payload and
//! metadata backends to construct, the namespace it serves, upload limits
//! and — for image namespaces — the version pipeline policy. The structs
//! deserialize from whatever format the embedding application uses (TOML,
//! JSON, ...); backend selection happens through the tagged enums at
//! configuration time, not through any runtime lookup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Payload storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PayloadBackendConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for payloads.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        #[serde(default)]
        endpoint: Option<String>,
        /// AWS region.
        #[serde(default)]
        region: Option<String>,
        /// Static access key id; omit both credentials to use the ambient
        /// provider chain.
        #[serde(default)]
        access_key_id: Option<String>,
        /// Static secret access key.
        #[serde(default)]
        secret_access_key: Option<String>,
        /// Use path-style addressing (required by most S3 emulators).
        #[serde(default)]
        force_path_style: bool,
        /// Lifetime of presigned download URLs, in seconds.
        #[serde(default = "default_url_expiry_secs")]
        url_expiry_secs: u64,
    },
}

fn default_url_expiry_secs() -> u64 {
    86400 // one day
}

impl PayloadBackendConfig {
    /// Validate the configuration before constructing a backend.
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Self::Filesystem { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::Config(
                        "filesystem storage path must not be empty".to_string(),
                    ));
                }
            }
            Self::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                url_expiry_secs,
                ..
            } => {
                if bucket.is_empty() {
                    return Err(crate::Error::Config(
                        "S3 bucket must not be empty".to_string(),
                    ));
                }
                if access_key_id.is_some() != secret_access_key.is_some() {
                    return Err(crate::Error::Config(
                        "S3 credentials must be provided together or not at all".to_string(),
                    ));
                }
                if *url_expiry_secs == 0 {
                    return Err(crate::Error::Config(
                        "url_expiry_secs must be greater than zero".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Metadata storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataBackendConfig {
    /// SQLite database file.
    Sqlite {
        /// Database path.
        path: PathBuf,
    },
}

impl MetadataBackendConfig {
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Self::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::Config(
                        "sqlite database path must not be empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Upload limits and batch behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum payload length in bytes. Zero disables the limit.
    #[serde(default)]
    pub max_file_size: u64,
    /// Whether zero-length uploads are stored.
    #[serde(default)]
    pub allow_empty_files: bool,
    /// When set, an upload whose hash matches an existing record in the
    /// namespace returns that record instead of storing a duplicate.
    #[serde(default)]
    pub dedup_uploads: bool,
    /// Upper bound on files processed concurrently within one batch.
    #[serde(default = "default_max_parallel_uploads")]
    pub max_parallel_uploads: usize,
}

fn default_max_parallel_uploads() -> usize {
    8
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: 0,
            allow_empty_files: false,
            dedup_uploads: false,
            max_parallel_uploads: default_max_parallel_uploads(),
        }
    }
}

/// Target encoding for stored image payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }
}

/// Image version pipeline policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Reject uploads that are not images.
    #[serde(default)]
    pub upload_must_be_image: bool,
    /// Persist the (reformatted) original payload at full resolution. The
    /// original's metadata is stored either way so repeated uploads can be
    /// recognized.
    #[serde(default = "default_true")]
    pub store_original: bool,
    /// Target encoding for stored images.
    #[serde(default = "default_format")]
    pub format: OutputFormat,
    /// Keep the source encoding instead of converting to `format`.
    #[serde(default)]
    pub preserve_format: bool,
    /// Encoder quality for lossy formats (1–100).
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Bounded sizes (longer edge, px) for the derived version cascade,
    /// largest first. Sizes not smaller than the uploaded image are
    /// skipped; the pipeline never upscales.
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Jpeg
}

fn default_quality() -> u8 {
    90
}

fn default_sizes() -> Vec<u32> {
    vec![1920, 960, 480, 240, 160]
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            upload_must_be_image: false,
            store_original: true,
            format: default_format(),
            preserve_format: false,
            quality: default_quality(),
            sizes: default_sizes(),
        }
    }
}

impl ImageConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(crate::Error::Config(format!(
                "image quality must be in 1..=100, got {}",
                self.quality
            )));
        }
        if self.sizes.is_empty() {
            return Err(crate::Error::Config(
                "image size cascade must not be empty".to_string(),
            ));
        }
        if self.sizes.contains(&0) {
            return Err(crate::Error::Config(
                "image sizes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sizes in descending order, deduplicated.
    pub fn cascade(&self) -> Vec<u32> {
        let mut sizes = self.sizes.clone();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes.dedup();
        sizes
    }
}

/// Configuration of one storage instance (one namespace).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Instance name, used for logging and middle-path dispatch.
    pub name: String,
    /// Namespace served by this instance.
    pub namespace: String,
    /// Payload backend selection.
    pub payload: PayloadBackendConfig,
    /// Metadata backend selection.
    pub metadata: MetadataBackendConfig,
    #[serde(default)]
    pub limits: UploadLimits,
    /// Present iff this instance runs the image pipeline.
    #[serde(default)]
    pub image: Option<ImageConfig>,
    /// Static middle-path prefix; `"avatar"` maps namespace `"42"` to
    /// middle path `"avatar42"`. Programmatic overrides go through
    /// `Orchestrator` construction instead.
    #[serde(default)]
    pub middle_path_prefix: Option<String>,
}

impl InstanceConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::Config(
                "instance name must not be empty".to_string(),
            ));
        }
        if self.namespace.is_empty() {
            return Err(crate::Error::Config(
                "namespace must not be empty".to_string(),
            ));
        }
        self.payload.validate()?;
        self.metadata.validate()?;
        if let Some(image) = &self.image {
            image.validate()?;
        }
        Ok(())
    }
}
