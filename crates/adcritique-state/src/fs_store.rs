//! Filesystem-backed report store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::*;

/// Report store writing one JSON document per critique attempt.
///
/// Layout: `<root>/reports/<run_id>/attempt-<n>.json`
pub struct FsReportStore {
    reports_dir: PathBuf,
}

impl FsReportStore {
    /// Create a store rooted at `root`. Creates `root/reports/` if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let reports_dir = root.as_ref().join("reports");
        fs::create_dir_all(&reports_dir)?;
        Ok(Self { reports_dir })
    }

    fn run_dir(&self, run_id: &RunId) -> StorageResult<PathBuf> {
        if !run_id.is_storage_safe() {
            return Err(StorageError::InvalidRunId {
                run_id: run_id.0.clone(),
            });
        }
        Ok(self.reports_dir.join(run_id.as_str()))
    }

    fn report_path(&self, key: &ReportKey) -> StorageResult<PathBuf> {
        Ok(self
            .run_dir(&key.run_id)?
            .join(format!("attempt-{}.json", key.attempt)))
    }
}

fn parse_attempt(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("attempt-")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn put_report(
        &self,
        key: &ReportKey,
        body: serde_json::Value,
    ) -> StorageResult<ContentDigest> {
        let path = self.report_path(key)?;
        let duplicate = || StorageError::DuplicateReport {
            run_id: key.run_id.0.clone(),
            attempt: key.attempt,
        };
        if path.exists() {
            return Err(duplicate());
        }

        let digest = ContentDigest::from_json(&body)?;
        let stored = StoredReport {
            key: key.clone(),
            digest: digest.clone(),
            body,
            stored_at: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&stored)?;

        let run_dir = self.run_dir(&key.run_id)?;
        fs::create_dir_all(&run_dir)?;

        // Atomic write: temp file in the same directory, then no-clobber rename.
        let mut tmp = NamedTempFile::new_in(&run_dir)?;
        tmp.write_all(&content)?;
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                duplicate()
            } else {
                StorageError::Io(e.error)
            }
        })?;

        debug!(report = %key, digest = %digest.short(), "report persisted");
        Ok(digest)
    }

    async fn get_report(&self, key: &ReportKey) -> StorageResult<StoredReport> {
        let path = self.report_path(key)?;
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::ReportNotFound {
                    run_id: key.run_id.0.clone(),
                    attempt: key.attempt,
                }
            } else {
                StorageError::Io(e)
            }
        })?;
        let stored: StoredReport = serde_json::from_slice(&bytes)?;

        let actual = ContentDigest::from_json(&stored.body)?;
        if actual != stored.digest {
            return Err(StorageError::DigestMismatch {
                run_id: key.run_id.0.clone(),
                attempt: key.attempt,
                expected: stored.digest.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(stored)
    }

    async fn list_reports(&self, run_id: &RunId) -> StorageResult<Vec<ReportKey>> {
        let run_dir = self.run_dir(run_id)?;
        let entries = match fs::read_dir(&run_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut attempts = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(attempt) = entry.file_name().to_str().and_then(parse_attempt) {
                attempts.push(attempt);
            }
        }
        attempts.sort_unstable();
        Ok(attempts
            .into_iter()
            .map(|attempt| ReportKey::new(run_id.clone(), attempt))
            .collect())
    }

    async fn delete_run(&self, run_id: &RunId) -> StorageResult<usize> {
        let removed = self.list_reports(run_id).await?.len();
        let run_dir = self.run_dir(run_id)?;
        if run_dir.exists() {
            fs::remove_dir_all(&run_dir)?;
        }
        Ok(removed)
    }
}
