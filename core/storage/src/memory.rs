//! In-memory object store for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::provider::{ObjectMetadata, ObjectStore};
use hashsync_common::{Error, ObjectKey, Result};

/// Stored object.
#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    metadata: ObjectMetadata,
}

/// Injected failures.
#[derive(Debug, Default)]
struct Faults {
    bucket_unavailable: bool,
    failing_heads: HashSet<ObjectKey>,
    failing_puts: HashSet<ObjectKey>,
    all_puts_fail: bool,
}

/// In-memory object store.
///
/// Useful for testing and dry experiments. All data is stored in memory
/// and lost on drop. Failures can be injected per key to exercise the
/// engine's error policies.
pub struct MemoryStore {
    bucket: String,
    objects: RwLock<HashMap<ObjectKey, Entry>>,
    faults: RwLock<Faults>,
    put_count: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty store bound to `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
            faults: RwLock::new(Faults::default()),
            put_count: AtomicUsize::new(0),
        }
    }

    fn objects(&self) -> RwLockReadGuard<'_, HashMap<ObjectKey, Entry>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn objects_mut(&self) -> RwLockWriteGuard<'_, HashMap<ObjectKey, Entry>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> RwLockReadGuard<'_, Faults> {
        self.faults.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults_mut(&self) -> RwLockWriteGuard<'_, Faults> {
        self.faults.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place an object directly, bypassing `put_object` and its counter.
    pub fn insert_object(
        &self,
        key: ObjectKey,
        data: Vec<u8>,
        user_metadata: HashMap<String, String>,
    ) {
        let metadata = ObjectMetadata {
            key: key.clone(),
            size: Some(data.len() as u64),
            modified: Some(Utc::now()),
            etag: Some(Uuid::new_v4().to_string()),
            user_metadata,
        };
        self.objects_mut().insert(key, Entry { data, metadata });
    }

    /// Get the content stored at `key`.
    pub fn object_data(&self, key: &ObjectKey) -> Option<Vec<u8>> {
        self.objects().get(key).map(|e| e.data.clone())
    }

    /// Get the metadata stored at `key`.
    pub fn object_metadata(&self, key: &ObjectKey) -> Option<ObjectMetadata> {
        self.objects().get(key).map(|e| e.metadata.clone())
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self.objects().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of successful `put_object` calls so far.
    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    /// Make `head_bucket` fail or succeed.
    pub fn set_bucket_available(&self, available: bool) {
        self.faults_mut().bucket_unavailable = !available;
    }

    /// Make `head_object` fail for `key`.
    pub fn fail_head_for(&self, key: ObjectKey) {
        self.faults_mut().failing_heads.insert(key);
    }

    /// Make `put_object` fail for `key`.
    pub fn fail_put_for(&self, key: ObjectKey) {
        self.faults_mut().failing_puts.insert(key);
    }

    /// Make every `put_object` fail.
    pub fn fail_all_puts(&self, fail: bool) {
        self.faults_mut().all_puts_fail = fail;
    }

    /// Remove all injected failures.
    pub fn clear_faults(&self) {
        *self.faults_mut() = Faults::default();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_bucket(&self) -> Result<()> {
        if self.faults().bucket_unavailable {
            return Err(Error::Connectivity(format!(
                "Bucket unavailable: {}",
                self.bucket
            )));
        }
        Ok(())
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<Option<ObjectMetadata>> {
        if self.faults().failing_heads.contains(key) {
            return Err(Error::Probe(format!("Injected head failure: {}", key)));
        }
        Ok(self.objects().get(key).map(|e| e.metadata.clone()))
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        source: &Path,
        metadata: HashMap<String, String>,
    ) -> Result<ObjectMetadata> {
        {
            let faults = self.faults();
            if faults.all_puts_fail || faults.failing_puts.contains(key) {
                return Err(Error::Upload(format!("Injected put failure: {}", key)));
            }
        }

        let data = tokio::fs::read(source).await?;
        let object = ObjectMetadata {
            key: key.clone(),
            size: Some(data.len() as u64),
            modified: Some(Utc::now()),
            etag: Some(Uuid::new_v4().to_string()),
            user_metadata: metadata,
        };

        self.objects_mut().insert(
            key.clone(),
            Entry {
                data,
                metadata: object.clone(),
            },
        );
        self.put_count.fetch_add(1, Ordering::SeqCst);

        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HASH_METADATA_KEY;

    fn key(s: &str) -> ObjectKey {
        ObjectKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_head() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"Hello, World!").unwrap();

        let store = MemoryStore::new("bucket");
        let meta = HashMap::from([(HASH_METADATA_KEY.to_string(), "abc".to_string())]);
        store.put_object(&key("a.txt"), &file, meta).await.unwrap();

        let head = store.head_object(&key("a.txt")).await.unwrap().unwrap();
        assert_eq!(head.size, Some(13));
        assert_eq!(head.user_value(HASH_METADATA_KEY), Some("abc"));
        assert_eq!(store.object_data(&key("a.txt")).unwrap(), b"Hello, World!");
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn test_head_missing_is_none() {
        let store = MemoryStore::default();
        assert!(store.head_object(&key("nope.txt")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_head_failure() {
        let store = MemoryStore::default();
        store.fail_head_for(key("x.txt"));
        assert!(store.head_object(&key("x.txt")).await.is_err());
        assert!(store.head_object(&key("y.txt")).await.unwrap().is_none());

        store.clear_faults();
        assert!(store.head_object(&key("x.txt")).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_put_failure_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"data").unwrap();

        let store = MemoryStore::default();
        store.fail_all_puts(true);
        let result = store.put_object(&key("a.txt"), &file, HashMap::new()).await;

        assert!(result.is_err());
        assert!(store.keys().is_empty());
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_bucket_availability() {
        let store = MemoryStore::default();
        assert!(store.head_bucket().await.is_ok());

        store.set_bucket_available(false);
        assert!(store.head_bucket().await.is_err());
    }

    #[tokio::test]
    async fn test_put_missing_source_fails() {
        let store = MemoryStore::default();
        let result = store
            .put_object(&key("a.txt"), Path::new("/definitely/missing"), HashMap::new())
            .await;
        assert!(result.is_err());
    }
}
