//! Remote state probing.
//!
//! A probe never fails: an absent object, an unreachable store, a timeout
//! and unusable metadata all read as "not uploaded yet".

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use hashsync_common::{ContentHash, Error, ObjectKey};
use hashsync_storage::{ObjectStore, HASH_METADATA_KEY};

/// What the remote store currently holds for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteState {
    /// Whether an object exists (as far as the probe could tell).
    pub exists: bool,
    /// Digest recorded in the object's metadata, if any.
    pub stored_hash: Option<ContentHash>,
}

impl RemoteState {
    /// State for a key with no object.
    pub fn absent() -> Self {
        Self {
            exists: false,
            stored_hash: None,
        }
    }

    /// Whether the local content must be uploaded.
    pub fn needs_upload(&self, local: &ContentHash) -> bool {
        !self.exists || self.stored_hash.as_ref() != Some(local)
    }
}

/// Issues metadata-only checks against the store.
pub struct RemoteProber<S: ObjectStore + ?Sized> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: ObjectStore + ?Sized> RemoteProber<S> {
    /// Create a prober with a per-call deadline.
    pub fn new(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Determine the remote state of `key`.
    pub async fn probe(&self, key: &ObjectKey) -> RemoteState {
        let head = tokio::time::timeout(self.timeout, self.store.head_object(key)).await;

        let metadata = match head {
            Ok(Ok(Some(metadata))) => metadata,
            Ok(Ok(None)) => {
                debug!("No remote object at {}", key);
                return RemoteState::absent();
            }
            Ok(Err(e)) => {
                warn!("Probe of {} failed, treating as absent: {}", key, e);
                return RemoteState::absent();
            }
            Err(_) => {
                let e = Error::Timeout(format!("head_object {} after {:?}", key, self.timeout));
                warn!("Probe of {} failed, treating as absent: {}", key, e);
                return RemoteState::absent();
            }
        };

        let stored_hash = metadata
            .user_value(HASH_METADATA_KEY)
            .and_then(|value| match ContentHash::new(value) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    debug!("Ignoring stored hash on {}: {}", key, e);
                    None
                }
            });

        RemoteState {
            exists: true,
            stored_hash,
        }
    }
}
