//! Shared test doubles.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use hashsync_common::{ObjectKey, Result};
use hashsync_storage::{ObjectMetadata, ObjectStore};

/// Store whose requests never complete.
pub(crate) struct HangingStore;

#[async_trait]
impl ObjectStore for HangingStore {
    fn name(&self) -> &str {
        "hanging"
    }

    fn bucket(&self) -> &str {
        "hanging"
    }

    async fn head_bucket(&self) -> Result<()> {
        std::future::pending().await
    }

    async fn head_object(&self, _key: &ObjectKey) -> Result<Option<ObjectMetadata>> {
        std::future::pending().await
    }

    async fn put_object(
        &self,
        _key: &ObjectKey,
        _source: &Path,
        _metadata: HashMap<String, String>,
    ) -> Result<ObjectMetadata> {
        std::future::pending().await
    }
}
