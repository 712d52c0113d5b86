//! Exclusion lists for directories, exact paths and file names.
//!
//! Lists are optional. A missing or malformed list behaves like an empty
//! one: exclusions narrow a run, they never stop it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use hashsync_common::{Error, Result};

/// How directory prefixes are matched against file paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryMatch {
    /// Prefix must end on a path-segment boundary.
    #[default]
    Segment,
    /// Plain string prefix; `/data/a` also matches `/data/ab`.
    Raw,
}

/// Locations of the three exclusion lists.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSources {
    /// JSON array of excluded directory prefixes.
    pub directories: Option<PathBuf>,
    /// JSON array of excluded exact file paths.
    pub files: Option<PathBuf>,
    /// JSON array of excluded bare file names.
    pub filenames: Option<PathBuf>,
    /// Matching policy for directory prefixes.
    pub directory_match: DirectoryMatch,
}

/// Immutable exclusion index, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    directory_prefixes: Vec<String>,
    file_paths: HashSet<String>,
    filenames: HashSet<String>,
    directory_match: DirectoryMatch,
}

impl ExclusionSet {
    /// Build an index from in-memory lists.
    ///
    /// Empty directory prefixes are dropped since they would match every
    /// path.
    pub fn new(
        directory_prefixes: impl IntoIterator<Item = String>,
        file_paths: impl IntoIterator<Item = String>,
        filenames: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut prefixes: Vec<String> = directory_prefixes
            .into_iter()
            .filter(|p| {
                if p.is_empty() {
                    warn!("Ignoring empty directory exclusion");
                }
                !p.is_empty()
            })
            .collect();
        prefixes.sort();
        prefixes.dedup();

        Self {
            directory_prefixes: prefixes,
            file_paths: file_paths.into_iter().collect(),
            filenames: filenames.into_iter().collect(),
            directory_match: DirectoryMatch::default(),
        }
    }

    /// Set the directory matching policy.
    pub fn with_directory_match(mut self, directory_match: DirectoryMatch) -> Self {
        self.directory_match = directory_match;
        self
    }

    /// Load all three lists, failing open on each.
    pub fn load(sources: &ExclusionSources) -> Self {
        let set = Self::new(
            Self::load_list(sources.directories.as_deref()),
            Self::load_list(sources.files.as_deref()),
            Self::load_list(sources.filenames.as_deref()),
        )
        .with_directory_match(sources.directory_match);

        debug!(
            "Loaded exclusions: {} directories, {} files, {} filenames",
            set.directory_prefixes.len(),
            set.file_paths.len(),
            set.filenames.len()
        );
        set
    }

    /// Load one list; absent, unreadable or malformed sources yield an
    /// empty set.
    pub fn load_list(path: Option<&Path>) -> HashSet<String> {
        let Some(path) = path else {
            return HashSet::new();
        };

        if !path.exists() {
            debug!("Exclusion list {} not found, using empty list", path.display());
            return HashSet::new();
        }

        match Self::read_list(path) {
            Ok(list) => list,
            Err(e) => {
                warn!("{}; using empty list", e);
                HashSet::new()
            }
        }
    }

    fn read_list(path: &Path) -> Result<HashSet<String>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Exclusion(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let list: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            Error::Exclusion(format!("Malformed list {}: {}", path.display(), e))
        })?;
        Ok(list.into_iter().collect())
    }

    /// Check whether a file is excluded.
    ///
    /// `path` is matched against directory prefixes and exact paths,
    /// `filename` against bare names. Any single match excludes.
    pub fn is_excluded(&self, path: &str, filename: &str) -> bool {
        self.directory_prefixes
            .iter()
            .any(|prefix| self.under_prefix(path, prefix))
            || self.file_paths.contains(path)
            || self.filenames.contains(filename)
    }

    fn under_prefix(&self, path: &str, prefix: &str) -> bool {
        match self.directory_match {
            DirectoryMatch::Raw => path.starts_with(prefix),
            DirectoryMatch::Segment => match path.strip_prefix(prefix) {
                None => false,
                Some(rest) => {
                    rest.is_empty()
                        || prefix.ends_with(['/', '\\'])
                        || rest.starts_with(['/', '\\'])
                }
            },
        }
    }

    /// Total number of entries across the three lists.
    pub fn len(&self) -> usize {
        self.directory_prefixes.len() + self.file_paths.len() + self.filenames.len()
    }

    /// Check if no exclusions are configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
