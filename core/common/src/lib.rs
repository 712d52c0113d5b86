//! Common utilities and types shared across hashsync modules.
//!
//! This module provides the error type and the small value types that cross
//! crate boundaries: destination keys, content digests and secrets.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ContentHash, ObjectKey, Secret};
