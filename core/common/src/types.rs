//! Common types used throughout hashsync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Content digest of a local file or of a stored object.
///
/// Always rendered as lower-case hexadecimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Create a ContentHash from a hexadecimal string.
    ///
    /// # Errors
    /// - Returns error if the string is empty or not hexadecimal
    pub fn new(hex: impl Into<String>) -> crate::Result<Self> {
        let hex = hex.into();
        if hex.is_empty() {
            return Err(crate::Error::InvalidInput(
                "ContentHash cannot be empty".to_string(),
            ));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidInput(format!(
                "ContentHash must be hexadecimal: {}",
                hex
            )));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Render a 64-bit digest as 16 zero-padded hex digits.
    pub fn from_u64(digest: u64) -> Self {
        Self(format!("{:016x}", digest))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination key of an object in the remote store.
///
/// Keys are relative, use '/' as the only separator and never contain
/// empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Parse a key string, accepting both '/' and '\\' as separators.
    ///
    /// Leading and trailing separators are dropped.
    ///
    /// # Errors
    /// - Returns error if no segment remains
    /// - Returns error if a segment is `.` or `..`
    pub fn parse(key: &str) -> crate::Result<Self> {
        let segments: Vec<&str> = key
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect();

        if segments.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Object key cannot be empty".to_string(),
            ));
        }

        for segment in &segments {
            if *segment == "." || *segment == ".." {
                return Err(crate::Error::InvalidInput(format!(
                    "Object key cannot contain relative segments: {}",
                    key
                )));
            }
        }

        Ok(Self(segments.join("/")))
    }

    /// Build a key from a path relative to the sync base directory.
    ///
    /// # Errors
    /// - Path is absolute or escapes its base with `..`
    /// - Path is not valid UTF-8
    pub fn from_relative_path(path: &Path) -> crate::Result<Self> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        crate::Error::InvalidInput(format!(
                            "Path is not valid UTF-8: {}",
                            path.display()
                        ))
                    })?;
                    parts.push(part);
                }
                Component::CurDir => {}
                _ => {
                    return Err(crate::Error::InvalidInput(format!(
                        "Path must be relative to the base directory: {}",
                        path.display()
                    )));
                }
            }
        }
        Self::parse(&parts.join("/"))
    }

    /// Get the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Secret string that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}
