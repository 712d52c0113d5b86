//! Object store trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use hashsync_common::{ObjectKey, Result};

/// User metadata key carrying the content digest of an uploaded object.
pub const HASH_METADATA_KEY: &str = "xxhash";

/// User metadata key carrying the local path an object was uploaded from.
pub const SOURCE_PATH_METADATA_KEY: &str = "original_path";

/// Metadata for a stored object, as returned by a head request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Key of the object.
    pub key: ObjectKey,
    /// Size in bytes, if reported.
    pub size: Option<u64>,
    /// Last modification time, if reported.
    pub modified: Option<DateTime<Utc>>,
    /// ETag reported by the store.
    pub etag: Option<String>,
    /// User metadata attached at upload time.
    pub user_metadata: HashMap<String, String>,
}

impl ObjectMetadata {
    /// Get a user metadata value by key.
    ///
    /// Lookup is case-insensitive since S3-compatible stores lower-case
    /// metadata keys.
    pub fn user_value(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Remote object store scoped to a single bucket.
///
/// This is the only surface the sync engine needs from an S3-compatible
/// store. Implementations do not retry; every error is returned to the
/// caller as-is.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the store name (e.g., "s3", "memory").
    fn name(&self) -> &str;

    /// Get the bucket this store is bound to.
    fn bucket(&self) -> &str;

    /// Check that the bucket exists and is reachable with the configured
    /// credentials.
    async fn head_bucket(&self) -> Result<()>;

    /// Fetch object metadata without transferring content.
    ///
    /// # Returns
    /// - `Ok(None)` if no object exists at `key`
    ///
    /// # Errors
    /// - Network, authentication or malformed response errors
    async fn head_object(&self, key: &ObjectKey) -> Result<Option<ObjectMetadata>>;

    /// Upload the content of a local file to `key`.
    ///
    /// # Postconditions
    /// - Object at `key` holds the file content and `metadata` as user
    ///   metadata, replacing any previous object
    ///
    /// # Errors
    /// - File cannot be read
    /// - Network/store errors
    async fn put_object(
        &self,
        key: &ObjectKey,
        source: &Path,
        metadata: HashMap<String, String>,
    ) -> Result<ObjectMetadata>;
}
