//! Sync configuration and run-mode presets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use hashsync_common::{Error, Result};

/// Configuration for the sync planner.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory destination keys are computed relative to.
    pub base_dir: PathBuf,
    /// Walk roots; the base directory when empty.
    pub roots: Vec<PathBuf>,
    /// Allowed extensions, lower-cased with a leading dot.
    pub extensions: Vec<String>,
    /// Maximum number of files processed at once.
    pub concurrency: usize,
    /// Deadline for each network call.
    pub network_timeout: Duration,
    /// Whether to follow directory symlinks while walking.
    pub follow_links: bool,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the base
    /// directory and the extension allow-list.
    pub fn new(base_dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            roots: Vec::new(),
            extensions: extensions
                .into_iter()
                .map(|ext| ext.trim().to_lowercase())
                .collect(),
            concurrency: 8,
            network_timeout: Duration::from_secs(30),
            follow_links: false,
        }
    }

    /// Set the walk roots.
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// Set the worker concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-call network timeout.
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Enable or disable following symlinks.
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Roots to walk.
    pub fn walk_roots(&self) -> Vec<PathBuf> {
        if self.roots.is_empty() {
            vec![self.base_dir.clone()]
        } else {
            self.roots.clone()
        }
    }

    /// Check whether a lower-cased extension is in the allow-list.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// - Base directory missing or not a directory
    /// - Empty or malformed extension list
    /// - Zero concurrency or timeout
    /// - A root outside the base directory
    pub fn validate(&self) -> Result<()> {
        if !self.base_dir.is_dir() {
            return Err(Error::Config(format!(
                "sync.base_dir is not a directory: {}",
                self.base_dir.display()
            )));
        }

        if self.extensions.is_empty() {
            return Err(Error::Config("sync.extensions must not be empty".to_string()));
        }
        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(Error::Config(format!(
                    "Extension must start with a dot: {:?}",
                    ext
                )));
            }
        }

        if self.concurrency == 0 {
            return Err(Error::Config("sync.concurrency must be at least 1".to_string()));
        }
        if self.network_timeout.is_zero() {
            return Err(Error::Config("Network timeout must be positive".to_string()));
        }

        let base = canonical(&self.base_dir)?;
        for root in &self.roots {
            let resolved = canonical(root)?;
            if !resolved.starts_with(&base) {
                return Err(Error::Config(format!(
                    "Root {} is outside the base directory {}",
                    root.display(),
                    self.base_dir.display()
                )));
            }
        }

        Ok(())
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path)
        .map_err(|e| Error::Config(format!("Cannot resolve {}: {}", path.display(), e)))
}

/// What a run does with files that need uploading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Upload stale files instead of only reporting them.
    pub perform_uploads: bool,
    /// Print per-extension counts after the run.
    pub print_extension_summary: bool,
}

/// Named presets kept for compatibility with the numbered legacy modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Mode 1: check bucket connectivity only.
    CheckConnection,
    /// Mode 2: report what would be sent, upload nothing.
    Report,
    /// Mode 3: upload and write the report.
    Upload,
    /// Mode 4: upload, write the report, print extension summary.
    UploadWithSummary,
    /// Mode 5: same behaviour as mode 4.
    Sync,
}

impl RunMode {
    /// Map a legacy mode number (1-5) onto a preset.
    ///
    /// # Errors
    /// - Number outside 1..=5
    pub fn from_legacy(mode: u8) -> Result<Self> {
        match mode {
            1 => Ok(Self::CheckConnection),
            2 => Ok(Self::Report),
            3 => Ok(Self::Upload),
            4 => Ok(Self::UploadWithSummary),
            5 => Ok(Self::Sync),
            other => Err(Error::InvalidInput(format!(
                "Unknown mode {}; expected 1-5",
                other
            ))),
        }
    }

    /// Options for a file-processing run; `None` for connectivity checks.
    pub fn options(self) -> Option<RunOptions> {
        let (perform_uploads, print_extension_summary) = match self {
            Self::CheckConnection => return None,
            Self::Report => (false, false),
            Self::Upload => (true, false),
            Self::UploadWithSummary | Self::Sync => (true, true),
        };
        Some(RunOptions {
            perform_uploads,
            print_extension_summary,
        })
    }
}
