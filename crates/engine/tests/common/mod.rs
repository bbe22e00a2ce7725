//! Shared helpers for engine integration tests.

pub mod fixtures;
pub mod memory;

use larder_core::config::{ImageConfig, UploadLimits};
use larder_engine::Orchestrator;
use larder_metadata::SqliteStore;
use memory::MemoryPayloadStore;
use std::sync::Arc;

#[allow(dead_code)]
pub const NAMESPACE: &str = "tenant1";

/// Orchestrator on an in-memory payload store and an in-memory SQLite
/// metadata store.
#[allow(dead_code)]
pub async fn orchestrator_with(
    limits: UploadLimits,
    image: Option<ImageConfig>,
) -> (Arc<Orchestrator>, Arc<MemoryPayloadStore>) {
    let payload = MemoryPayloadStore::new();
    let metadata = Arc::new(SqliteStore::in_memory().await.unwrap());
    let orchestrator = Arc::new(Orchestrator::new(
        "test",
        NAMESPACE,
        payload.clone(),
        metadata,
        limits,
        image,
    ));
    (orchestrator, payload)
}

#[allow(dead_code)]
pub async fn default_orchestrator() -> (Arc<Orchestrator>, Arc<MemoryPayloadStore>) {
    orchestrator_with(UploadLimits::default(), None).await
}
