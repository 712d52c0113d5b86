//! Configuration file for the `hashsync` binary.
//!
//! One TOML file describes the store, the local tree, the report location
//! and the exclusion lists. It is parsed and validated once at startup;
//! relative paths are resolved against the working directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hashsync_common::{Error, Result};
use hashsync_storage::S3Settings;
use hashsync_sync::{DirectoryMatch, ExclusionSources, SyncConfig};

/// Whole configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub store: StoreSection,
    pub sync: SyncSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub exclusions: ExclusionSection,
}

/// `[store]`
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    /// Registered store name.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Per-call network deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub settings: S3Settings,
}

/// `[sync]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSection {
    pub base_dir: PathBuf,
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    pub extensions: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub follow_links: bool,
}

/// `[report]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSection {
    #[serde(default = "default_report_path")]
    pub path: PathBuf,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            path: default_report_path(),
        }
    }
}

/// `[exclusions]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionSection {
    #[serde(default)]
    pub dir_exclusions: Option<PathBuf>,
    #[serde(default)]
    pub file_exclusions: Option<PathBuf>,
    #[serde(default)]
    pub filename_exclusions: Option<PathBuf>,
    #[serde(default)]
    pub directory_match: DirectoryMatch,
}

fn default_provider() -> String {
    "s3".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    8
}

fn default_report_path() -> PathBuf {
    PathBuf::from("report.json")
}

impl AppConfig {
    /// Read and parse a configuration file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - Content is not valid TOML for this schema
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check every section; the first problem is returned.
    pub fn validate(&self) -> Result<()> {
        if self.store.provider.trim().is_empty() {
            return Err(Error::Config("store.provider must not be empty".to_string()));
        }
        if self.store.timeout_secs == 0 {
            return Err(Error::Config("store.timeout_secs must be at least 1".to_string()));
        }
        self.store.settings.validate()?;
        self.sync_config().validate()?;
        if self.report.path.as_os_str().is_empty() {
            return Err(Error::Config("report.path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Per-call network deadline.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// Engine configuration derived from `[sync]` and `[store]`.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(&self.sync.base_dir, self.sync.extensions.clone())
            .with_roots(self.sync.roots.clone())
            .with_concurrency(self.sync.concurrency)
            .with_network_timeout(self.network_timeout())
            .with_follow_links(self.sync.follow_links)
    }

    /// Where the exclusion lists come from.
    pub fn exclusion_sources(&self) -> ExclusionSources {
        ExclusionSources {
            directories: self.exclusions.dir_exclusions.clone(),
            files: self.exclusions.file_exclusions.clone(),
            filenames: self.exclusions.filename_exclusions.clone(),
            directory_match: self.exclusions.directory_match,
        }
    }
}
