//! Core domain types and shared logic for Larder.
//!
//! This crate defines the canonical data model used across all other crates:
//! - File records, derivative descriptors and metadata patches
//! - Content hashing (MD5 payload identity)
//! - Storage key resolution and the middle-path extension point
//! - MIME type guessing from file names
//! - Configuration types for backends, limits and the image pipeline

pub mod config;
pub mod error;
pub mod hash;
pub mod keys;
pub mod mime;
pub mod record;

pub use config::{
    ImageConfig, InstanceConfig, MetadataBackendConfig, OutputFormat, PayloadBackendConfig,
    UploadLimits,
};
pub use error::{Error, Result};
pub use hash::{Md5Hash, Md5Hasher};
pub use keys::{KeyResolver, MiddlePathFn};
pub use record::{FileRecord, ListFilter, NewFileRecord, RecordPatch, VersionDescriptor};

/// The version name carried by as-uploaded artifacts.
pub const ORIGINAL_VERSION: &str = "original";
