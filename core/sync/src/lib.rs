//! hashsync Sync Engine
//!
//! This module decides which local files are missing or stale in a remote
//! bucket and uploads only those, including:
//! - Exclusion lists for directories, exact paths and file names
//! - Streaming XXH64 content digests
//! - Metadata-only remote probes that fail open to "needs upload"
//! - Bounded concurrent processing with per-call timeouts
//! - An ordered per-run report with extension statistics

pub mod config;
pub mod exclusion;
pub mod hasher;
pub mod planner;
pub mod probe;
pub mod report;
pub mod scan;
pub mod upload;

#[cfg(test)]
mod testing;

// Re-export main types
pub use config::{RunMode, RunOptions, SyncConfig};
pub use exclusion::{DirectoryMatch, ExclusionSet, ExclusionSources};
pub use hasher::{hash_bytes, hash_file};
pub use planner::SyncPlanner;
pub use probe::{RemoteProber, RemoteState};
pub use report::{ExtensionStats, RunTotals, SyncRecord, SyncReport};
pub use scan::{Candidate, TreeWalker};
pub use upload::{UploadOutcome, Uploader};
