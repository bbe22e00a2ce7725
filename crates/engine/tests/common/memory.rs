//! In-memory payload store test double with failure injection.

use async_trait::async_trait;
use bytes::Bytes;
use larder_storage::traits::{KeyStream, PayloadStore};
use larder_storage::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Payload store backed by a map, for exercising the workflow without a
/// real backend. `fail_puts_containing` injects write failures for keys
/// containing a needle, to drive the compensating-delete path.
pub struct MemoryPayloadStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_puts_containing: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl MemoryPayloadStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(BTreeMap::new()),
            fail_puts_containing: Mutex::new(None),
        })
    }

    /// Make every `put` whose key contains `needle` fail with an I/O error.
    pub fn fail_puts_containing(&self, needle: &str) {
        *self.fail_puts_containing.lock().unwrap() = Some(needle.to_string());
    }

    pub fn clear_failures(&self) {
        *self.fail_puts_containing.lock().unwrap() = None;
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Fetch an object without going through the async trait.
    pub fn get_sync(&self, key: &str) -> Bytes {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| panic!("no object stored under {key}"))
    }

    /// Seed an object directly, bypassing failure injection.
    pub fn seed(&self, key: &str, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.into());
    }
}

#[async_trait]
impl PayloadStore for MemoryPayloadStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes, _content_type: Option<&str>) -> StorageResult<()> {
        if let Some(needle) = self.fail_puts_containing.lock().unwrap().as_ref()
            && key.contains(needle.as_str())
        {
            return Err(StorageError::Io(std::io::Error::other(
                "injected put failure",
            )));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let data = objects
            .get(from)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        objects.insert(to.to_string(), data);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<KeyStream> {
        let keys: Vec<StorageResult<String>> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(keys)))
    }

    async fn url(&self, key: &str) -> StorageResult<String> {
        Ok(format!("memory://{key}"))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
