//! File metadata storage abstraction and backends for Larder.
//!
//! This crate provides:
//! - The [`MetadataStore`] capability contract: structured file records
//!   with store-assigned ids, partial updates and hash lookup
//! - A SQLite backend built on sqlx

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use sqlite::SqliteStore;
pub use store::MetadataStore;

use larder_core::config::MetadataBackendConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataBackendConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    config
        .validate()
        .map_err(|e| MetadataError::Config(e.to_string()))?;

    match config {
        MetadataBackendConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn from_config_sqlite_ok() {
        let temp = tempdir().unwrap();
        let config = MetadataBackendConfig::Sqlite {
            path: temp.path().join("meta.db"),
        };

        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
    }
}
