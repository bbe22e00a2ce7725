//! Legacy key migration.
//!
//! The original key scheme joined middle path, record id and version name
//! with dashes into one flat key. The migration enumerates a namespace's
//! payloads under that scheme and copies each to its slash-scheme key.
//! Keys already present under the new scheme are skipped, so the routine
//! is idempotent and a re-run after a partial failure picks up where the
//! previous one stopped.

use crate::error::EngineResult;
use crate::orchestrator::Orchestrator;
use futures::StreamExt;
use larder_storage::PayloadStore;
use serde::Serialize;

/// Counters reported by one migration run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Payloads copied to their new key.
    pub copied: u64,
    /// Payloads whose new key already existed.
    pub skipped: u64,
    /// Keys under the prefix that do not parse as legacy keys.
    pub ignored: u64,
}

pub(crate) async fn migrate_legacy_keys(
    orchestrator: &Orchestrator,
    remove_legacy: bool,
) -> EngineResult<MigrationReport> {
    let resolver = orchestrator.resolver();
    let namespace = orchestrator.namespace();
    let prefix = resolver.legacy_prefix(namespace);

    let mut report = MigrationReport::default();
    let mut keys = orchestrator.payload().list_keys(&prefix).await?;
    while let Some(key) = keys.next().await {
        let key = key?;
        let Some((record_id, version)) = resolver.parse_legacy(namespace, &key) else {
            report.ignored += 1;
            continue;
        };

        let new_key = resolver.resolve(namespace, record_id, &version);
        if orchestrator.payload().exists(&new_key).await? {
            report.skipped += 1;
        } else {
            orchestrator.payload().copy(&key, &new_key).await?;
            report.copied += 1;
        }
        if remove_legacy {
            orchestrator.payload().delete(&key).await?;
        }
    }

    tracing::info!(
        namespace = %namespace,
        copied = report.copied,
        skipped = report.skipped,
        ignored = report.ignored,
        "legacy key migration finished"
    );
    Ok(report)
}
