//! Upload executor.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use hashsync_common::{ContentHash, Error, ObjectKey};
use hashsync_storage::{ObjectStore, HASH_METADATA_KEY, SOURCE_PATH_METADATA_KEY};

/// Characters escaped in metadata values. Non-ASCII bytes are always
/// escaped since S3 metadata travels as HTTP headers.
const METADATA_VALUE: &AsciiSet = &CONTROLS.add(b'%');

/// Result of a single upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Content and metadata were stored.
    Sent,
    /// Nothing was stored; the file stays eligible for the next run.
    Failed(String),
}

impl UploadOutcome {
    /// Whether the upload went through.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// User metadata attached to every uploaded object.
pub fn upload_metadata(source: &Path, hash: &ContentHash) -> HashMap<String, String> {
    let source = source.to_string_lossy();
    HashMap::from([
        (HASH_METADATA_KEY.to_string(), hash.to_string()),
        (
            SOURCE_PATH_METADATA_KEY.to_string(),
            utf8_percent_encode(&source, METADATA_VALUE).to_string(),
        ),
    ])
}

/// Transfers files to the store, one attempt each.
pub struct Uploader<S: ObjectStore + ?Sized> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: ObjectStore + ?Sized> Uploader<S> {
    /// Create an uploader with a per-call deadline.
    pub fn new(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Upload `source` to `key`, tagging it with `hash`.
    pub async fn upload(&self, source: &Path, key: &ObjectKey, hash: &ContentHash) -> UploadOutcome {
        let metadata = upload_metadata(source, hash);
        let put = self.store.put_object(key, source, metadata);

        match tokio::time::timeout(self.timeout, put).await {
            Ok(Ok(_)) => {
                debug!("Uploaded {} -> {}", source.display(), key);
                UploadOutcome::Sent
            }
            Ok(Err(e)) => {
                error!("Failed to upload {}: {}", source.display(), e);
                UploadOutcome::Failed(e.to_string())
            }
            Err(_) => {
                let e = Error::Timeout(format!("put_object {} after {:?}", key, self.timeout));
                error!("Failed to upload {}: {}", source.display(), e);
                UploadOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_bytes;
    use crate::testing::HangingStore;
    use hashsync_storage::MemoryStore;

    fn key(s: &str) -> ObjectKey {
        ObjectKey::parse(s).unwrap()
    }

    #[test]
    fn test_metadata_carries_hash_and_encoded_path() {
        let hash = ContentHash::from_u64(42);
        let metadata = upload_metadata(Path::new("/data/тест 100%.txt"), &hash);

        assert_eq!(metadata[HASH_METADATA_KEY], "000000000000002a");
        let path = &metadata[SOURCE_PATH_METADATA_KEY];
        assert!(path.is_ascii());
        assert!(path.starts_with("/data/%D1%82"));
        assert!(path.ends_with(" 100%25.txt"));
    }

    #[tokio::test]
    async fn test_upload_stores_content_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"payload").unwrap();
        let hash = hash_bytes(b"payload");

        let store = Arc::new(MemoryStore::default());
        let uploader = Uploader::new(store.clone(), Duration::from_secs(5));

        let outcome = uploader.upload(&file, &key("a.txt"), &hash).await;
        assert!(outcome.is_sent());

        let stored = store.object_metadata(&key("a.txt")).unwrap();
        assert_eq!(stored.user_value(HASH_METADATA_KEY), Some(hash.as_str()));
        assert_eq!(store.object_data(&key("a.txt")).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_upload_failure_is_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"payload").unwrap();

        let store = Arc::new(MemoryStore::default());
        store.fail_put_for(key("a.txt"));
        let uploader = Uploader::new(store.clone(), Duration::from_secs(5));

        let outcome = uploader
            .upload(&file, &key("a.txt"), &hash_bytes(b"payload"))
            .await;
        assert!(matches!(outcome, UploadOutcome::Failed(_)));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_upload_timeout_is_failure() {
        let uploader = Uploader::new(Arc::new(HangingStore), Duration::from_millis(20));
        let outcome = uploader
            .upload(Path::new("/tmp/x.txt"), &key("x.txt"), &ContentHash::from_u64(1))
            .await;
        match outcome {
            UploadOutcome::Failed(reason) => {
                assert!(reason.starts_with("Timed out: put_object x.txt"))
            }
            UploadOutcome::Sent => panic!("hanging upload reported as sent"),
        }
    }
}
