//! Per-run sync records and their aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use hashsync_common::{ContentHash, Error, ObjectKey, Result};

use crate::scan::extension_of;

/// Outcome for one file that passed the exclusion and extension filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Local path as walked.
    pub file_path: String,
    /// Destination key in the bucket.
    #[serde(rename = "s3code")]
    pub destination_key: String,
    /// Content digest; empty when hashing failed.
    pub hash: String,
    /// When the record was emitted.
    pub date: DateTime<Utc>,
    /// Uploaded this run, or in a dry run: would be uploaded.
    pub sent: bool,
    /// Why the file could not be hashed or uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Local content differed from the remote state.
    #[serde(skip)]
    pub needs_upload: bool,
}

impl SyncRecord {
    /// Record for a file whose digest was computed.
    pub fn hashed(
        file_path: impl Into<String>,
        key: &ObjectKey,
        hash: &ContentHash,
        needs_upload: bool,
        sent: bool,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            destination_key: key.to_string(),
            hash: hash.to_string(),
            date: Utc::now(),
            sent,
            error: None,
            needs_upload,
        }
    }

    /// Record for a file that could not be processed.
    pub fn failed(
        file_path: impl Into<String>,
        destination_key: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            destination_key: destination_key.into(),
            hash: String::new(),
            date: Utc::now(),
            sent: false,
            error: Some(error.into()),
            needs_upload: true,
        }
    }

    /// Attach an error to an otherwise complete record.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Lower-cased extension of the file path.
    pub fn extension(&self) -> String {
        let name = Path::new(&self.file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        extension_of(&name)
    }

    /// Whether processing this file hit an error.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-extension counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionStats {
    pub total: usize,
    pub sent: usize,
}

/// Whole-run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Ordered sequence of records for one run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    records: Vec<SyncRecord>,
}

impl SyncReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn record(&mut self, record: SyncRecord) {
        self.records.push(record);
    }

    /// All records in discovery order.
    pub fn records(&self) -> &[SyncRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counts by extension, sorted by extension.
    pub fn summarize(&self) -> BTreeMap<String, ExtensionStats> {
        let mut stats: BTreeMap<String, ExtensionStats> = BTreeMap::new();
        for record in &self.records {
            let entry = stats.entry(record.extension()).or_default();
            entry.total += 1;
            if record.sent {
                entry.sent += 1;
            }
        }
        stats
    }

    /// Totals across the run.
    pub fn totals(&self) -> RunTotals {
        RunTotals {
            total: self.records.len(),
            sent: self.records.iter().filter(|r| r.sent).count(),
            failed: self.records.iter().filter(|r| r.is_failed()).count(),
        }
    }

    /// Serialize to a JSON array with 2-space indentation.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.records).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a previously written report.
    pub fn from_json(json: &str) -> Result<Self> {
        let records = serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self { records })
    }

    /// Write the report to `path`, replacing any previous content.
    ///
    /// The file is written next to its destination first and renamed into
    /// place, so readers never observe a partial report.
    pub async fn persist(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = temp_path(path);
        fs::write(&tmp, json.as_bytes()).await?;
        fs::rename(&tmp, path).await?;

        debug!("Wrote {} records to {}", self.records.len(), path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, sent: bool) -> SyncRecord {
        let key = ObjectKey::parse(path.trim_start_matches("/data/")).unwrap();
        SyncRecord::hashed(path, &key, &ContentHash::from_u64(7), sent, sent)
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record("/data/a.txt", true)).unwrap();
        let obj = json.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["date", "filePath", "hash", "s3code", "sent"]);
        assert_eq!(obj["s3code"], "a.txt");
        assert_eq!(obj["hash"], "0000000000000007");
    }

    #[test]
    fn test_failed_record_carries_error() {
        let failed = SyncRecord::failed("/data/b.txt", "b.txt", "permission denied");
        let json = serde_json::to_value(&failed).unwrap();

        assert_eq!(json["error"], "permission denied");
        assert_eq!(json["sent"], false);
        assert_eq!(json["hash"], "");
        assert!(failed.is_failed());
    }

    #[test]
    fn test_summarize_by_extension() {
        let mut report = SyncReport::new();
        report.record(record("/data/a.txt", true));
        report.record(record("/data/b.TXT", false));
        report.record(record("/data/c.pdf", true));

        let summary = report.summarize();
        assert_eq!(summary[".txt"], ExtensionStats { total: 2, sent: 1 });
        assert_eq!(summary[".pdf"], ExtensionStats { total: 1, sent: 1 });
        assert_eq!(
            summary.keys().cloned().collect::<Vec<_>>(),
            vec![".pdf".to_string(), ".txt".to_string()]
        );
    }

    #[test]
    fn test_totals() {
        let mut report = SyncReport::new();
        report.record(record("/data/a.txt", true));
        report.record(record("/data/b.txt", false));
        report.record(SyncRecord::failed("/data/c.txt", "c.txt", "boom"));

        assert_eq!(
            report.totals(),
            RunTotals {
                total: 3,
                sent: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn test_json_is_indented_array() {
        let mut report = SyncReport::new();
        report.record(record("/data/a.txt", true));

        let json = report.to_json().unwrap();
        assert!(json.starts_with("[\n  {\n    \"filePath\""));

        let restored = SyncReport::from_json(&json).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.records()[0].file_path, "/data/a.txt");
    }

    #[tokio::test]
    async fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/report.json");

        let mut first = SyncReport::new();
        first.record(record("/data/a.txt", true));
        first.record(record("/data/b.txt", true));
        first.persist(&path).await.unwrap();

        let mut second = SyncReport::new();
        second.record(record("/data/c.txt", false));
        second.persist(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let restored = SyncReport::from_json(&content).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.records()[0].file_path, "/data/c.txt");
        assert!(!temp_path(&path).exists());
    }
}
