//! Object store abstraction for hashsync.
//!
//! This module provides a trait-based interface over S3-compatible object
//! stores and a registry for resolving the configured backend by name.
//!
//! # Design Principles
//! - Store isolation: no store-specific logic in the sync engine
//! - Async operations: all I/O operations are async
//! - Single attempt: stores never retry, callers decide what a failure means

pub mod memory;
pub mod provider;
pub mod registry;
pub mod s3;

pub use memory::MemoryStore;
pub use provider::{ObjectMetadata, ObjectStore, HASH_METADATA_KEY, SOURCE_PATH_METADATA_KEY};
pub use registry::{create_default_registry, StoreFactory, StoreRegistry};
pub use s3::{S3Settings, S3Store};
