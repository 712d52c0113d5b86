//! Sync planner that orchestrates a whole run.
//!
//! A run walks the configured roots, filters candidates through the
//! exclusion index and the extension allow-list, hashes each remaining
//! file, compares the digest with the remote state and, when uploads are
//! enabled, transfers stale files. Every filtered-in file ends up as one
//! record in the returned report, including files that failed.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use hashsync_common::{Error, ObjectKey, Result};
use hashsync_storage::ObjectStore;

use crate::config::{RunOptions, SyncConfig};
use crate::exclusion::ExclusionSet;
use crate::hasher::hash_file_blocking;
use crate::probe::RemoteProber;
use crate::report::{SyncRecord, SyncReport};
use crate::scan::{Candidate, TreeWalker};
use crate::upload::{UploadOutcome, Uploader};

/// Plans and executes incremental uploads for one bucket.
pub struct SyncPlanner<S: ObjectStore + ?Sized> {
    /// Store for connectivity checks.
    store: Arc<S>,
    /// Remote state lookups.
    prober: RemoteProber<S>,
    /// Transfers.
    uploader: Uploader<S>,
    /// Exclusion index.
    exclusions: ExclusionSet,
    /// Configuration.
    config: SyncConfig,
}

impl<S: ObjectStore + ?Sized + 'static> SyncPlanner<S> {
    /// Create a planner.
    pub fn new(store: Arc<S>, config: SyncConfig, exclusions: ExclusionSet) -> Self {
        Self {
            prober: RemoteProber::new(store.clone(), config.network_timeout),
            uploader: Uploader::new(store.clone(), config.network_timeout),
            store,
            exclusions,
            config,
        }
    }

    /// Check that the bucket is reachable.
    ///
    /// # Errors
    /// - `Error::Connectivity` on any failure or timeout
    pub async fn check_connection(&self) -> Result<()> {
        let bucket = self.store.bucket().to_string();
        match tokio::time::timeout(self.config.network_timeout, self.store.head_bucket()).await {
            Ok(Ok(())) => {
                info!("Connected to bucket {} via {}", bucket, self.store.name());
                Ok(())
            }
            Ok(Err(Error::Connectivity(msg))) => Err(Error::Connectivity(msg)),
            Ok(Err(e)) => Err(Error::Connectivity(format!("Bucket {}: {}", bucket, e))),
            Err(_) => Err(Error::Connectivity(format!(
                "Bucket {}: no response within {:?}",
                bucket, self.config.network_timeout
            ))),
        }
    }

    /// Run one pass over the local tree.
    ///
    /// Per-file failures are recorded, never returned.
    ///
    /// # Errors
    /// - The walk task could not be joined
    pub async fn run(&self, options: RunOptions) -> Result<SyncReport> {
        let start = Instant::now();
        info!(
            "Starting {} run over {}",
            if options.perform_uploads { "upload" } else { "dry" },
            self.config.base_dir.display()
        );

        let candidates = self.discover().await?;
        let discovered = candidates.len();

        let selected: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| self.accepts(candidate))
            .collect();

        debug!("{} of {} files selected", selected.len(), discovered);

        let records: Vec<SyncRecord> = stream::iter(selected)
            .map(|candidate| self.process(candidate, options))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut report = SyncReport::new();
        for record in records {
            report.record(record);
        }

        let totals = report.totals();
        info!(
            "Run completed in {:?}: {} files, {} sent, {} failed",
            start.elapsed(),
            totals.total,
            totals.sent,
            totals.failed
        );

        Ok(report)
    }

    /// Walk the configured roots on the blocking pool.
    async fn discover(&self) -> Result<Vec<Candidate>> {
        let roots = self.config.walk_roots();
        let walker = TreeWalker::new().follow_links(self.config.follow_links);

        tokio::task::spawn_blocking(move || walker.walk(&roots))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))
    }

    /// Apply the exclusion index and the extension allow-list.
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        if self
            .exclusions
            .is_excluded(&candidate.path_string(), &candidate.filename)
        {
            debug!("Excluded {}", candidate.path.display());
            return false;
        }
        self.config.allows_extension(&candidate.extension)
    }

    /// Destination key for a walked path.
    ///
    /// # Errors
    /// - Path is not under the base directory
    pub fn destination_key(&self, path: &Path) -> Result<ObjectKey> {
        let relative = match path.strip_prefix(&self.config.base_dir) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => resolved_relative(&self.config.base_dir, path)?,
        };
        ObjectKey::from_relative_path(&relative)
    }

    /// Hash, probe and optionally upload one file.
    async fn process(&self, candidate: Candidate, options: RunOptions) -> SyncRecord {
        let file_path = candidate.path_string();

        let key = match self.destination_key(&candidate.path) {
            Ok(key) => key,
            Err(e) => {
                warn!("No destination key for {}: {}", file_path, e);
                return SyncRecord::failed(file_path, "", e.to_string());
            }
        };

        let hash = match hash_file_blocking(candidate.path.clone()).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("{}", e);
                return SyncRecord::failed(file_path, key.as_str(), e.to_string());
            }
        };

        let remote = self.prober.probe(&key).await;
        let needs_upload = remote.needs_upload(&hash);

        if !options.perform_uploads {
            debug!("{} -> {}: needs upload = {}", file_path, key, needs_upload);
            return SyncRecord::hashed(file_path, &key, &hash, needs_upload, needs_upload);
        }

        if !needs_upload {
            debug!("{} is up to date", file_path);
            return SyncRecord::hashed(file_path, &key, &hash, false, false);
        }

        let outcome = self.uploader.upload(&candidate.path, &key, &hash).await;
        let record = SyncRecord::hashed(file_path, &key, &hash, true, outcome.is_sent());
        match outcome {
            UploadOutcome::Sent => record,
            UploadOutcome::Failed(reason) => record.with_error(reason),
        }
    }
}

/// Relative path computed on canonical directories, for roots reached
/// through symlinks or spelled differently from the base directory. The
/// file name itself is kept so a file symlink keeps its own key.
fn resolved_relative(base: &Path, path: &Path) -> Result<PathBuf> {
    let base = std::fs::canonicalize(base)?;
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(Error::InvalidInput(format!(
            "{} has no file name",
            path.display()
        )));
    };
    let path = std::fs::canonicalize(parent)?.join(name);
    path.strip_prefix(&base)
        .map(Path::to_path_buf)
        .map_err(|_| {
            Error::InvalidInput(format!(
                "{} is not under {}",
                path.display(),
                base.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HangingStore;
    use hashsync_storage::MemoryStore;
    use std::time::Duration;

    fn planner(base: &Path) -> SyncPlanner<MemoryStore> {
        let config = SyncConfig::new(base, vec![".txt".to_string()]);
        SyncPlanner::new(Arc::new(MemoryStore::default()), config, ExclusionSet::default())
    }

    #[test]
    fn test_destination_key_is_relative() {
        let planner = planner(Path::new("/data"));
        let key = planner
            .destination_key(Path::new("/data/sub/dir/a.txt"))
            .unwrap();
        assert_eq!(key.as_str(), "sub/dir/a.txt");
    }

    #[test]
    fn test_destination_key_outside_base_fails() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let file = other.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();

        let planner = planner(dir.path());
        assert!(planner.destination_key(&file).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_destination_key_through_linked_root_keeps_link_name() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        std::fs::create_dir(&base).unwrap();
        std::fs::write(base.join("z.txt"), b"z").unwrap();
        std::os::unix::fs::symlink(base.join("z.txt"), base.join("a_link.txt")).unwrap();
        let alias = dir.path().join("alias");
        std::os::unix::fs::symlink(&base, &alias).unwrap();

        let planner = planner(&base);
        let key = planner.destination_key(&alias.join("a_link.txt")).unwrap();
        assert_eq!(key.as_str(), "a_link.txt");
    }

    #[test]
    fn test_accepts_filters_extension_and_exclusions() {
        let config = SyncConfig::new("/data", vec![".txt".to_string()]);
        let exclusions = ExclusionSet::new(vec![], vec![], vec!["skip.txt".to_string()]);
        let planner = SyncPlanner::new(Arc::new(MemoryStore::default()), config, exclusions);

        let keep = Candidate::from_path(PathBuf::from("/data/a.TXT")).unwrap();
        let wrong_ext = Candidate::from_path(PathBuf::from("/data/b.tmp")).unwrap();
        let skipped = Candidate::from_path(PathBuf::from("/data/skip.txt")).unwrap();

        assert!(planner.accepts(&keep));
        assert!(!planner.accepts(&wrong_ext));
        assert!(!planner.accepts(&skipped));
    }

    #[tokio::test]
    async fn test_check_connection() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let config = SyncConfig::new(dir.path(), vec![".txt".to_string()]);
        let planner = SyncPlanner::new(store.clone(), config, ExclusionSet::default());

        assert!(planner.check_connection().await.is_ok());

        store.set_bucket_available(false);
        assert!(matches!(
            planner.check_connection().await,
            Err(Error::Connectivity(_))
        ));
    }

    #[tokio::test]
    async fn test_check_connection_timeout() {
        let config = SyncConfig::new("/data", vec![".txt".to_string()])
            .with_network_timeout(Duration::from_millis(20));
        let planner = SyncPlanner::new(Arc::new(HangingStore), config, ExclusionSet::default());

        assert!(matches!(
            planner.check_connection().await,
            Err(Error::Connectivity(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_failed_record() {
        let dir = tempfile::tempdir().unwrap();
        let planner = planner(dir.path());
        let vanished = Candidate::from_path(dir.path().join("gone.txt")).unwrap();

        let record = planner
            .process(
                vanished,
                RunOptions {
                    perform_uploads: true,
                    print_extension_summary: false,
                },
            )
            .await;

        assert_eq!(record.destination_key, "gone.txt");
        assert!(record.is_failed());
        assert!(!record.sent);
        assert!(record.hash.is_empty());
    }

    #[tokio::test]
    async fn test_run_hanging_store_records_every_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();

        let config = SyncConfig::new(dir.path(), vec![".txt".to_string()])
            .with_network_timeout(Duration::from_millis(20));
        let planner = SyncPlanner::new(Arc::new(HangingStore), config, ExclusionSet::default());

        let report = planner
            .run(RunOptions {
                perform_uploads: true,
                print_extension_summary: false,
            })
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        for record in report.records() {
            assert!(record.needs_upload);
            assert!(!record.sent);
            assert!(!record.hash.is_empty());
            let error = record.error.as_deref().unwrap_or_default();
            let expected = format!("Timed out: put_object {}", record.destination_key);
            assert!(error.starts_with(&expected), "unexpected error: {}", error);
        }
    }
}
