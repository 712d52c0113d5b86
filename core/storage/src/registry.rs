//! Store registry for resolving a backend by name.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::ObjectStore;
use crate::s3::S3Settings;
use hashsync_common::{Error, Result};

/// Factory function type for creating stores.
pub type StoreFactory =
    Box<dyn Fn(S3Settings) -> BoxFuture<'static, Result<Arc<dyn ObjectStore>>> + Send + Sync>;

/// Registry for object store factories.
///
/// Allows the configured `store.provider` name to be resolved into a
/// concrete store.
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a store factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: StoreFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::InvalidInput(format!(
                "Store '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a store by name and settings.
    ///
    /// # Errors
    /// - Store not registered
    /// - Settings invalid for the store
    pub async fn resolve(&self, name: &str, settings: S3Settings) -> Result<Arc<dyn ObjectStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Store '{}' is not registered (available: {})",
                    name,
                    self.stores().join(", ")
                ))
            })?;
        factory(settings).await
    }

    /// Get sorted list of registered store names.
    pub fn stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in stores.
pub fn create_default_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();

    let builtin: [(&str, StoreFactory); 2] = [
        (
            "s3",
            Box::new(|settings| {
                Box::pin(async move {
                    let store = crate::s3::S3Store::connect(&settings).await?;
                    Ok(Arc::new(store) as Arc<dyn ObjectStore>)
                })
            }),
        ),
        (
            "memory",
            Box::new(|settings| {
                Box::pin(async move {
                    Ok(Arc::new(crate::memory::MemoryStore::new(settings.bucket))
                        as Arc<dyn ObjectStore>)
                })
            }),
        ),
    ];

    for (name, factory) in builtin {
        registry.factories.insert(name.to_string(), factory);
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn settings(bucket: &str) -> S3Settings {
        S3Settings {
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: bucket.to_string(),
            access_key: None,
            secret_key: None,
            force_path_style: true,
        }
    }

    fn memory_factory() -> StoreFactory {
        Box::new(|s| {
            Box::pin(async move { Ok(Arc::new(MemoryStore::new(s.bucket)) as Arc<dyn ObjectStore>) })
        })
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let mut registry = StoreRegistry::new();
        registry.register("test", memory_factory()).unwrap();

        let store = registry.resolve("test", settings("b1")).await.unwrap();
        assert_eq!(store.name(), "memory");
        assert_eq!(store.bucket(), "b1");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = StoreRegistry::new();
        registry.register("test", memory_factory()).unwrap();
        assert!(registry.register("test", memory_factory()).is_err());
    }

    #[tokio::test]
    async fn test_resolve_unknown_lists_available() {
        let registry = create_default_registry();
        match registry.resolve("gcs", settings("b")).await {
            Err(Error::Config(msg)) => {
                assert_eq!(msg, "Store 'gcs' is not registered (available: memory, s3)")
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("unknown store resolved"),
        }
    }

    #[test]
    fn test_default_registry_stores() {
        let registry = create_default_registry();
        assert_eq!(registry.stores(), vec!["memory".to_string(), "s3".to_string()]);
    }
}
