//! Tree walking and candidate discovery.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A discovered regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path as produced by the walk (root joined with relative segments).
    pub path: PathBuf,
    /// Final path component.
    pub filename: String,
    /// Lower-cased extension with leading dot, empty when there is none.
    pub extension: String,
}

impl Candidate {
    /// Build a candidate from a walked path.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let filename = path.file_name()?.to_string_lossy().into_owned();
        let extension = extension_of(&filename);
        Some(Self {
            path,
            filename,
            extension,
        })
    }

    /// Path rendered as a string for exclusion matching and reporting.
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Lower-cased extension of a file name, including the dot.
///
/// Leading dots do not start an extension, so `.bashrc` has none and
/// `archive.tar.gz` has `.gz`.
pub fn extension_of(filename: &str) -> String {
    let stem_start = filename.len() - filename.trim_start_matches('.').len();
    match filename[stem_start..].rfind('.') {
        Some(idx) => filename[stem_start + idx..].to_lowercase(),
        None => String::new(),
    }
}

/// Walker over one or more roots that yields each file once.
#[derive(Debug, Clone, Default)]
pub struct TreeWalker {
    /// Whether to follow directory symlinks.
    follow_links: bool,
}

impl TreeWalker {
    /// Create a new walker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to follow symbolic links.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Walk all roots in order and return every regular file found.
    ///
    /// Entries within a directory are visited in file-name order. A path
    /// reached through several overlapping roots is returned once, at its
    /// first discovery; a file symlink and its target are distinct paths
    /// and both are returned. Unreadable entries and link loops are logged
    /// and skipped.
    pub fn walk(&self, roots: &[PathBuf]) -> Vec<Candidate> {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut candidates = Vec::new();

        for root in roots {
            let walker = WalkDir::new(root)
                .follow_links(self.follow_links)
                .sort_by_file_name();

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                        continue;
                    }
                };

                let file_type = entry.file_type();
                let is_file = file_type.is_file()
                    || (file_type.is_symlink() && entry.path().is_file());
                if !is_file {
                    continue;
                }

                let path = entry.into_path();
                if !visited.insert(visit_key(&path)) {
                    debug!("Already visited {}", path.display());
                    continue;
                }

                if let Some(candidate) = Candidate::from_path(path) {
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }
}

/// Identity of a walked path for deduplication.
///
/// Lexical only: symlinks are not resolved, so each name in the tree keeps
/// its own destination key.
fn visit_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
