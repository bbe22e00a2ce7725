//! Storage orchestration and upload workflow engine for Larder.
//!
//! This crate ties the payload and metadata stores together:
//! - [`Orchestrator`]: per-namespace coordinator constructed from
//!   configuration, hosting key resolution and the legacy-key migration
//! - [`FilesAction`]: the upload/list/update/delete workflow with per-item
//!   failure isolation ([`BaseFilesAction`] for arbitrary files,
//!   [`ImageAction`] adding the derived version pipeline)
//! - [`ImageCodec`]: the decode/resize/encode contract consumed by the
//!   image pipeline, implemented on the `image` crate by [`RustCodec`]

pub mod action;
pub mod codec;
pub mod error;
pub mod image_action;
pub mod migrate;
pub mod orchestrator;

pub use action::{
    BaseFilesAction, FilesAction, IncomingFile, UploadBatch, UploadFailure, UploadOutcome,
};
pub use codec::{CodecError, DecodedImage, ImageCodec, RustCodec};
pub use error::{EngineError, EngineResult};
pub use image_action::ImageAction;
pub use migrate::MigrationReport;
pub use orchestrator::Orchestrator;
