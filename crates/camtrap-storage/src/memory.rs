//! In-memory object store for tests and local runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::object_store::{ObjectInfo, ObjectStore};

/// [`ObjectStore`] backed by a map, keyed like a bucket.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with one object.
    pub fn with_object(self, key: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.objects.lock().unwrap().insert(key.into(), bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str, max_keys: Option<i32>) -> StorageResult<Vec<ObjectInfo>> {
        let objects = self.objects.lock().unwrap();
        let mut infos: Vec<_> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, bytes)| ObjectInfo {
                key: key.clone(),
                size: bytes.len() as u64,
            })
            .collect();

        if let Some(max) = max_keys {
            infos.truncate(max.max(0) as usize);
        }
        Ok(infos)
    }

    async fn list_all(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        self.list(prefix, None).await
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn check_liveness(&self) -> StorageResult<()> {
        Ok(())
    }
}
